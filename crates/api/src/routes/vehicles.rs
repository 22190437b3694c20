//! Vehicle endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use haulage_core::vehicle::{CreateVehicleInput, UpdateVehicleInput};
use haulage_db::VehicleListQuery;
use haulage_shared::types::{PageRequest, VehicleId};

use crate::{AppState, error::ApiResult, middleware::auth::AuthUser};

/// Creates vehicle routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/vehicles/{vehicle_id}",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
}

/// GET /vehicles
async fn list_vehicles(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<VehicleListQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.vehicles.list(auth.actor(), query, page).await?))
}

/// POST /vehicles
async fn create_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateVehicleInput>,
) -> ApiResult<impl IntoResponse> {
    let vehicle = state.repos.vehicles.create(auth.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// GET /vehicles/{vehicle_id}
async fn get_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vehicle_id): Path<VehicleId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.vehicles.view(auth.actor(), vehicle_id).await?))
}

/// PATCH /vehicles/{vehicle_id}
async fn update_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vehicle_id): Path<VehicleId>,
    Json(input): Json<UpdateVehicleInput>,
) -> ApiResult<impl IntoResponse> {
    let vehicle = state
        .repos
        .vehicles
        .update(auth.actor(), vehicle_id, input)
        .await?;
    Ok(Json(vehicle))
}

/// DELETE /vehicles/{vehicle_id}
async fn delete_vehicle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(vehicle_id): Path<VehicleId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.vehicles.disable(auth.actor(), vehicle_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_duplicate_plate_conflict() {
        let app = TestApp::new().await;
        let (status, vehicle) = app
            .send("POST", "/api/v1/vehicles", Some(json!({ "plateNumber": " abj-113-kd " })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(vehicle["plateNumber"], "ABJ-113-KD");
        assert_eq!(vehicle["status"], "Available");

        let (status, json) = app
            .send("POST", "/api/v1/vehicles", Some(json!({ "plateNumber": "ABJ-113-KD" })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "conflict");
    }

    #[tokio::test]
    async fn test_on_trip_status_not_settable() {
        let app = TestApp::new().await;
        let (_, vehicle) = app
            .send("POST", "/api/v1/vehicles", Some(json!({ "plateNumber": "KJA-900-AA" })))
            .await;
        let id = vehicle["id"].as_str().unwrap();

        let (status, _) = app
            .send(
                "PATCH",
                &format!("/api/v1/vehicles/{id}"),
                Some(json!({ "status": "On Trip" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = app
            .send("GET", "/api/v1/vehicles?status=Available", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meta"]["total"], 1);
    }
}
