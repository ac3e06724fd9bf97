use std::{net::SocketAddr, sync::Arc};

use axum::http::{header, HeaderName, Method};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use relay_server::auth::VOICE_TOKEN_HEADER;
use relay_server::config::ServerConfig;
use relay_server::{create_router, AppState, START_TIME};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting TTS relay server...");

    // Initialize start time for uptime calculation
    let _ = START_TIME.get_or_init(std::time::Instant::now);

    let config = ServerConfig::from_env();
    if config.voice_token.is_none() {
        warn!("VOICE_TOKEN not set, all synthesis requests will be rejected");
    }
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, provider_timeout={}s",
        config.port, config.rate_limit_per_minute, config.provider_timeout_secs
    );
    info!(pacing = ?config.pacing(), max_segment_chars = config.max_segment_chars, "relay pacing");

    let state = AppState::new(config.clone());

    let cors = cors_layer(&config);

    // Rate limiting configuration
    // GlobalKeyExtractor shares one limit across all callers, which also works
    // behind proxies where the client IP is not reliable
    let per_minute = config.rate_limit_per_minute.max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(u64::from(per_minute / 60).max(1))
            .burst_size(per_minute)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", per_minute);

    // No request timeout: a long text legitimately takes minutes of paced calls.
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(cors)
        .into_inner();

    let app = create_router(state).layer(middleware_stack);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

// CORS configuration - environment-aware
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(VOICE_TOKEN_HEADER),
        ])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(false);

    let Some(allowed_origins) = config.cors_allowed_origins.as_ref() else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        return base.allow_origin(tower_http::cors::Any);
    };

    let origins: Vec<axum::http::HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
        base.allow_origin(tower_http::cors::Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(tower_http::cors::AllowOrigin::list(origins))
    }
}
