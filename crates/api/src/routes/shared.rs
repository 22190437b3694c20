//! Public invoice share links.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use haulage_shared::types::OrganizationId;
use serde::Deserialize;

use crate::{AppState, error::ApiResult};

/// The share code from the link.
#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    /// Share code issued by `POST /invoices/{id}/share`.
    pub code: String,
}

/// Creates public share routes. These are served without a token.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/public/organizations/{organization_id}/invoices/{invoice_code}",
        get(view_shared_invoice),
    )
}

/// GET /public/organizations/{organization_id}/invoices/{invoice_code}?code=
async fn view_shared_invoice(
    State(state): State<AppState>,
    Path((organization_id, invoice_code)): Path<(OrganizationId, String)>,
    Query(query): Query<ShareQuery>,
) -> ApiResult<impl IntoResponse> {
    let invoice = state
        .repos
        .invoices
        .view_shared(organization_id, &invoice_code, &query.code)
        .await?;
    Ok(Json(invoice))
}
