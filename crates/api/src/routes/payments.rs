//! Payment endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use haulage_core::billing::{CreatePaymentInput, UpdatePaymentInput};
use haulage_db::PaymentListQuery;
use haulage_shared::types::{PageRequest, PaymentId};
use tracing::info;

use crate::{AppState, error::ApiResult, middleware::auth::AuthUser};

/// Creates payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route(
            "/payments/{payment_id}",
            get(get_payment).patch(update_payment).delete(delete_payment),
        )
}

/// GET /payments
async fn list_payments(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PaymentListQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.payments.list(auth.actor(), query, page).await?))
}

/// POST /payments
///
/// Rejected with 422 and every failing line when any line would overpay.
async fn create_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreatePaymentInput>,
) -> ApiResult<impl IntoResponse> {
    let payment = state.repos.payments.create(auth.actor(), input).await?;
    info!(
        payment_id = %payment.payment_id,
        amount = %payment.amount,
        user_id = %auth.user_id(),
        "Payment recorded"
    );
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /payments/{payment_id}
async fn get_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(payment_id): Path<PaymentId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.payments.view(auth.actor(), payment_id).await?))
}

/// PATCH /payments/{payment_id}
async fn update_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(payment_id): Path<PaymentId>,
    Json(input): Json<UpdatePaymentInput>,
) -> ApiResult<impl IntoResponse> {
    let payment = state
        .repos
        .payments
        .update(auth.actor(), payment_id, input)
        .await?;
    Ok(Json(payment))
}

/// DELETE /payments/{payment_id}
async fn delete_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(payment_id): Path<PaymentId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.repos.payments.disable(auth.actor(), payment_id).await?))
}
