//! Trip endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use haulage_core::trip::{CreateTripInput, TripActionRequest, UpdateTripInput};
use haulage_db::TripListQuery;
use haulage_shared::types::{PageRequest, TripId};
use tracing::info;

use crate::{AppState, error::ApiResult, middleware::auth::AuthUser};

/// Creates trip routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route(
            "/trips/{trip_id}",
            get(get_trip).patch(update_trip).delete(delete_trip),
        )
        .route("/trips/{trip_id}/actions", post(trip_action))
}

/// GET /trips
async fn list_trips(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TripListQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    let trips = state.repos.trips.list(auth.actor(), query, page).await?;
    Ok(Json(trips))
}

/// POST /trips
async fn create_trip(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateTripInput>,
) -> ApiResult<impl IntoResponse> {
    let trip = state.repos.trips.create(auth.actor(), input).await?;
    info!(request_id = %trip.trip.request_id, user_id = %auth.user_id(), "Trip created");
    Ok((StatusCode::CREATED, Json(trip)))
}

/// GET /trips/{trip_id}
async fn get_trip(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(trip_id): Path<TripId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.trips.view(auth.actor(), trip_id).await?))
}

/// PATCH /trips/{trip_id}
async fn update_trip(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(trip_id): Path<TripId>,
    Json(input): Json<UpdateTripInput>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.trips.update(auth.actor(), trip_id, input).await?))
}

/// DELETE /trips/{trip_id}
async fn delete_trip(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(trip_id): Path<TripId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.trips.disable(auth.actor(), trip_id).await?))
}

/// POST /trips/{trip_id}/actions
async fn trip_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(trip_id): Path<TripId>,
    Json(request): Json<TripActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let trip = state
        .repos
        .trips
        .trip_action(auth.actor(), trip_id, request)
        .await?;
    Ok(Json(trip))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use haulage_core::vehicle::CreateVehicleInput;
    use serde_json::json;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_requires_token() {
        let app = TestApp::new().await;
        let (status, json) = app.send_anonymous("GET", "/api/v1/trips").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "missing_token");
    }

    #[tokio::test]
    async fn test_create_and_fetch_trip() {
        let app = TestApp::new().await;
        let trip = app.trip(1000).await;
        assert_eq!(trip["status"], "Pending");
        assert_eq!(trip["amountDue"], "1000");

        let id = trip["id"].as_str().unwrap();
        let (status, fetched) = app.send("GET", &format!("/api/v1/trips/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["requestId"], trip["requestId"]);

        let (status, list) = app.send("GET", "/api/v1/trips?page=1&per_page=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_missing_location_is_bad_request() {
        let app = TestApp::new().await;
        let (status, json) = app
            .send(
                "POST",
                "/api/v1/trips",
                Some(json!({
                    "vendorId": app.vendor,
                    "amount": 500,
                    "pickupLocation": "",
                    "deliveryLocation": "Kano",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_assign_vehicle_action() {
        let app = TestApp::new().await;
        let trip = app.trip(800).await;
        let vehicle = app
            .state
            .repos
            .vehicles
            .create(
                app.actor(),
                CreateVehicleInput {
                    plate_number: "lnd-402-xa".into(),
                    description: None,
                },
            )
            .await
            .unwrap();

        let id = trip["id"].as_str().unwrap();
        let (status, json) = app
            .send(
                "POST",
                &format!("/api/v1/trips/{id}/actions"),
                Some(json!({ "action": "assignVehicle", "vehicleId": vehicle.id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["status"], "Vehicle Assigned");

        let (status, json) = app
            .send(
                "POST",
                &format!("/api/v1/trips/{id}/actions"),
                Some(json!({ "action": "teleport" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_delete_trip() {
        let app = TestApp::new().await;
        let trip = app.trip(300).await;
        let id = trip["id"].as_str().unwrap();

        let (status, json) = app.send("DELETE", &format!("/api/v1/trips/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["disabled"], true);

        let (_, list) = app.send("GET", "/api/v1/trips", None).await;
        assert_eq!(list["meta"]["total"], 0);
    }
}
