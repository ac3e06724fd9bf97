pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod validation;

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use relay_core::{DeepgramClient, Relay, SpeechProvider};
use tracing::warn;

use crate::config::ServerConfig;
use crate::handlers::{health_check, metrics_endpoint, tts_endpoint, tts_single_endpoint};
use crate::metrics::AppMetrics;

// Process start, for the uptime reported by /metrics.
pub static START_TIME: OnceLock<Instant> = OnceLock::new();

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub config: ServerConfig,
    pub metrics: AppMetrics,
}

impl AppState {
    /// State backed by the Deepgram client described in `config`.
    pub fn new(config: ServerConfig) -> Self {
        if config.deepgram_api_key.is_none() {
            warn!("DEEPGRAM_API_KEY not set, every synthesis call will be rejected upstream");
        }
        let api_key = config.deepgram_api_key.clone().unwrap_or_default();
        let client = DeepgramClient::with_url(api_key, config.deepgram_url.clone());
        Self::with_provider(config, Arc::new(client))
    }

    pub fn with_provider(config: ServerConfig, provider: Arc<dyn SpeechProvider>) -> Self {
        let relay = Relay::new(provider, config.pacing(), config.max_segment_chars);
        Self {
            relay: Arc::new(relay),
            config,
            metrics: AppMetrics::new(),
        }
    }
}

// Request ID middleware for tracing
pub async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let Ok(value) = HeaderValue::from_str(&request_id) else {
        return next.run(request).await;
    };
    request.headers_mut().insert("x-request-id", value.clone());
    let mut response = next.run(request).await;
    response.headers_mut().insert("x-request-id", value);
    response
}

/// Routes served both at the root and under `/api`.
///
/// Only the synthesis routes require the voice token.
pub fn create_router(state: AppState) -> Router {
    let synthesis_api = Router::new()
        .route("/tts", post(tts_endpoint))
        .route("/tts/single", post(tts_single_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_voice_token,
        ));

    let public_api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics_endpoint));

    let api = Router::new().merge(public_api).merge(synthesis_api);

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(middleware::from_fn(add_request_id))
        .with_state(state)
}
