use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::RelayError;
use serde::Serialize;
use thiserror::Error;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid token")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream synthesis error: {0}")]
    Upstream(RelayError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        if e.is_upstream() {
            ApiError::Upstream(e)
        } else {
            ApiError::InternalError(e.to_string())
        }
    }
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut upstream_status = None;
        let (status, error_message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(e) => {
                tracing::error!("Upstream error: {}", e);
                upstream_status = e.upstream_status();
                let detail = match e {
                    RelayError::Upstream { body, .. } => body,
                    other => other.to_string(),
                };
                (StatusCode::BAD_GATEWAY, format!("Deepgram API error: {}", detail))
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
            upstream_status,
        });

        (status, body).into_response()
    }
}
