//! Shared-secret check for the synthesis routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the shared secret.
pub const VOICE_TOKEN_HEADER: &str = "x-voice-token";

/// Reject the request with 401 unless it carries the configured voice token.
///
/// Runs before the body is read, so a rejected request never reaches the
/// provider. With no token configured every request is rejected.
pub async fn require_voice_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(VOICE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    if token_matches(provided, state.config.voice_token.as_deref()) {
        return Ok(next.run(request).await);
    }

    state.metrics.relay.record_auth_failure();
    warn!(
        path = %request.uri().path(),
        header_present = provided.is_some(),
        "voice token rejected"
    );
    Err(ApiError::Unauthorized)
}

/// Constant-time comparison; a missing side never matches.
pub fn token_matches(provided: Option<&str>, expected: Option<&str>) -> bool {
    match (provided, expected) {
        (Some(provided), Some(expected)) => provided.as_bytes().ct_eq(expected.as_bytes()).into(),
        _ => false,
    }
}
