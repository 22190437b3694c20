//! Invoice endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use haulage_core::billing::{CreateInvoiceInput, UpdateInvoiceInput};
use haulage_db::InvoiceListQuery;
use haulage_shared::types::{InvoiceId, PageRequest};
use tracing::info;

use crate::{AppState, error::ApiResult, middleware::auth::AuthUser};

/// Creates invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route(
            "/invoices/{invoice_id}",
            get(get_invoice).patch(update_invoice).delete(delete_invoice),
        )
        .route("/invoices/{invoice_id}/share", post(share_invoice))
}

/// GET /invoices
async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<InvoiceListQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.invoices.list(auth.actor(), query, page).await?))
}

/// POST /invoices
async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateInvoiceInput>,
) -> ApiResult<impl IntoResponse> {
    let invoice = state.repos.invoices.create(auth.actor(), input).await?;
    info!(
        invoice_id = %invoice.invoice.invoice_id,
        trips = invoice.invoice.request_ids.len(),
        "Invoice created"
    );
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /invoices/{invoice_id}
async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<InvoiceId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.invoices.view(auth.actor(), invoice_id).await?))
}

/// PATCH /invoices/{invoice_id}
async fn update_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<InvoiceId>,
    Json(input): Json<UpdateInvoiceInput>,
) -> ApiResult<impl IntoResponse> {
    let invoice = state
        .repos
        .invoices
        .update(auth.actor(), invoice_id, input)
        .await?;
    Ok(Json(invoice))
}

/// DELETE /invoices/{invoice_id}
async fn delete_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<InvoiceId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.invoices.disable(auth.actor(), invoice_id).await?))
}

/// POST /invoices/{invoice_id}/share
///
/// Issues a fresh share code; any previous code stops working.
async fn share_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<InvoiceId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.invoices.share(auth.actor(), invoice_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let app = TestApp::new().await;
        let trip = app.trip(1000).await;
        let request_id = trip["requestId"].as_str().unwrap();

        let (status, invoice) = app
            .send(
                "POST",
                "/api/v1/invoices",
                Some(json!({ "requestIds": [request_id], "amount": 1000 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{invoice}");
        assert_eq!(invoice["status"], "Draft");
        let code = invoice["invoiceId"].as_str().unwrap();

        let (status, _) = app
            .send(
                "POST",
                "/api/v1/payments",
                Some(json!({
                    "invoiceId": code,
                    "requestIds": [{ "requestId": request_id, "amount": 250 }],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let id = invoice["id"].as_str().unwrap();
        let (status, fetched) = app.send("GET", &format!("/api/v1/invoices/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["status"], "Partially Paid");
        assert_eq!(fetched["sentToCustomer"], true);
    }

    #[tokio::test]
    async fn test_total_mismatch_rejected() {
        let app = TestApp::new().await;
        let trip = app.trip(1000).await;

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/invoices",
                Some(json!({ "requestIds": [trip["requestId"]], "amount": 900 })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "business_rule_violation");
    }

    #[tokio::test]
    async fn test_invoice_payment_needs_lines() {
        let app = TestApp::new().await;
        let trip = app.trip(600).await;

        let (status, invoice) = app
            .send(
                "POST",
                "/api/v1/invoices",
                Some(json!({ "requestIds": [trip["requestId"]], "amount": 600 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{invoice}");
        let id = invoice["id"].as_str().unwrap();

        let (status, json) = app
            .send(
                "POST",
                "/api/v1/payments",
                Some(json!({ "invoiceId": invoice["invoiceId"], "amount": 50 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");

        let (_, after) = app.send("GET", &format!("/api/v1/invoices/{id}"), None).await;
        assert_eq!(after["status"], "Draft");
        assert_eq!(after["sentToCustomer"], false);
    }
}
