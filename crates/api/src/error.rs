//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use haulage_shared::AppError;
use serde_json::json;
use tracing::error;

/// An [`AppError`] rendered as `{error, message}` JSON.
///
/// Internal errors are logged with their detail and answered with a generic
/// message.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.0.is_internal() {
            error!(error = %self.0, code = self.0.error_code(), "Request failed");
        }
        (
            status,
            Json(json!({
                "error": self.0.error_code().to_lowercase(),
                "message": self.0.public_message(),
            })),
        )
            .into_response()
    }
}

/// Handler result.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Validation("amount must be positive".into()), StatusCode::BAD_REQUEST)]
    #[case(AppError::NotFound("Trip 123456 not found".into()), StatusCode::NOT_FOUND)]
    #[case(AppError::BusinessRule("overpaid".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(AppError::Conflict("stale".into()), StatusCode::CONFLICT)]
    #[case(AppError::Forbidden("who".into()), StatusCode::FORBIDDEN)]
    fn test_status_mapping(#[case] err: AppError, #[case] status: StatusCode) {
        assert_eq!(ApiError(err).into_response().status(), status);
    }

    #[tokio::test]
    async fn test_internal_detail_hidden() {
        let response = ApiError(AppError::Database("connection reset by peer".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "database_error");
        assert_eq!(json["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_validation_message_verbatim() {
        let response = ApiError(AppError::Validation("pickupLocation is required".into())).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "pickupLocation is required");
    }
}
