//! Remark threads on trips, vehicles, payments and invoices.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use haulage_db::RemarkTarget;
use haulage_shared::types::RemarkId;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiResult, middleware::auth::AuthUser};

/// Remark text.
#[derive(Debug, Deserialize)]
pub struct RemarkBody {
    /// The remark.
    pub remark: String,
}

/// Creates remark routes for every document kind.
pub fn routes() -> Router<AppState> {
    [
        ("/trips/{trip_id}", RemarkTarget::Trip),
        ("/vehicles/{vehicle_id}", RemarkTarget::Vehicle),
        ("/payments/{payment_id}", RemarkTarget::Payment),
        ("/invoices/{invoice_id}", RemarkTarget::Invoice),
    ]
    .into_iter()
    .fold(Router::new(), |router, (parent, target)| {
        router.merge(target_routes(parent, target))
    })
}

/// Parameter names must match the parent resource's routes.
fn target_routes(parent: &str, target: RemarkTarget) -> Router<AppState> {
    Router::new()
        .route(
            &format!("{parent}/remarks"),
            get(list_remarks).post(add_remark),
        )
        .route(
            &format!("{parent}/remarks/{{remark_id}}"),
            patch(edit_remark).delete(delete_remark),
        )
        .layer(Extension(target))
}

/// GET /{target}/{id}/remarks
async fn list_remarks(
    State(state): State<AppState>,
    Extension(target): Extension<RemarkTarget>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.remarks.list(auth.actor(), target, id).await?))
}

/// POST /{target}/{id}/remarks
async fn add_remark(
    State(state): State<AppState>,
    Extension(target): Extension<RemarkTarget>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RemarkBody>,
) -> ApiResult<impl IntoResponse> {
    let remark = state
        .repos
        .remarks
        .add(auth.actor(), target, id, &body.remark)
        .await?;
    Ok((StatusCode::CREATED, Json(remark)))
}

/// PATCH /{target}/{id}/remarks/{remark_id}
async fn edit_remark(
    State(state): State<AppState>,
    Extension(target): Extension<RemarkTarget>,
    auth: AuthUser,
    Path((id, remark_id)): Path<(Uuid, RemarkId)>,
    Json(body): Json<RemarkBody>,
) -> ApiResult<impl IntoResponse> {
    let remark = state
        .repos
        .remarks
        .edit(auth.actor(), target, id, remark_id, &body.remark)
        .await?;
    Ok(Json(remark))
}

/// DELETE /{target}/{id}/remarks/{remark_id}
async fn delete_remark(
    State(state): State<AppState>,
    Extension(target): Extension<RemarkTarget>,
    auth: AuthUser,
    Path((id, remark_id)): Path<(Uuid, RemarkId)>,
) -> ApiResult<impl IntoResponse> {
    let remark = state
        .repos
        .remarks
        .delete(auth.actor(), target, id, remark_id)
        .await?;
    Ok(Json(remark))
}
