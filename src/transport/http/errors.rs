use crate::domain::error::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// HTTP face of [`PipelineError`]. Each variant gets its own status so the
/// provider's redelivery logic can tell them apart.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            PipelineError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing or invalid token".to_string(),
            ),
            PipelineError::MalformedEvent(msg) => {
                (StatusCode::BAD_REQUEST, "malformed_event", msg.clone())
            }
            PipelineError::Storage(err) => {
                tracing::error!("storage error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_unavailable",
                    "event not applied, retry later".to_string(),
                )
            }
            PipelineError::Timeout => {
                tracing::error!("request timed out before the event was applied");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "timeout",
                    "event not applied, retry later".to_string(),
                )
            }
            PipelineError::Internal(err) => {
                tracing::error!("internal error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            PipelineError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
