use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use relay_core::{content_type_for, Mode, RelayError, SynthesisRequest, ARCHIVE_FILENAME};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::metrics::{DetailedMetricsResponse, EndpointMetrics, EndpointMetricsResponse, SystemMetrics};
use crate::validation::{validate_single_shot, validate_synthesis_request};
use crate::{AppState, START_TIME};

#[derive(Serialize)]
pub struct SingleShotResponse {
    pub audio_base64: String,
    pub encoding: String,
    pub bytes: usize,
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn tts_endpoint(
    State(state): State<AppState>,
    Json(req): Json<SynthesisRequest>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let result = relay_tts(&state, req).await;
    record(&state, &state.metrics.tts, start, &result);
    result
}

async fn relay_tts(state: &AppState, req: SynthesisRequest) -> Result<Response, ApiError> {
    validate_synthesis_request(&req, state.config.max_text_chars)?;
    info!(
        mode = ?req.mode,
        chars = req.text.chars().count(),
        encoding = req.options.extension(),
        "tts request received"
    );

    match req.mode {
        Mode::File => {
            let archive = state.relay.run_batch(&req.text, &req.options).await?;
            state.metrics.relay.record_segments(archive.len(), archive.audio_bytes());

            let zipped = archive.zip();
            info!(parts = archive.len(), zip_bytes = zipped.len(), "archive ready");

            Ok((
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename={ARCHIVE_FILENAME}"),
                    ),
                ],
                zipped,
            )
                .into_response())
        }
        Mode::Stream => {
            let mut parts = Box::pin(state.relay.run_stream(&req.text, &req.options)?);

            // Hold the response until the first segment arrives so an early
            // provider failure is still reported as a 502.
            let first = match parts.next().await {
                Some(Ok(audio)) => audio,
                Some(Err(e)) => return Err(e.into()),
                None => Bytes::new(),
            };

            let metrics = state.metrics.relay.clone();
            let body = stream::once(async move { Ok::<Bytes, RelayError>(first) })
                .chain(parts)
                .inspect(move |item| match item {
                    Ok(audio) => metrics.record_segments(1, audio.len()),
                    Err(_) => metrics.record_upstream_error(),
                });

            Ok((
                [(header::CONTENT_TYPE, content_type_for(req.options.extension()))],
                Body::from_stream(body),
            )
                .into_response())
        }
    }
}

pub async fn tts_single_endpoint(
    State(state): State<AppState>,
    Json(req): Json<SynthesisRequest>,
) -> Result<Json<SingleShotResponse>, ApiError> {
    let start = Instant::now();
    let result = relay_single(&state, req).await;
    record(&state, &state.metrics.tts_single, start, &result);
    result
}

async fn relay_single(
    state: &AppState,
    req: SynthesisRequest,
) -> Result<Json<SingleShotResponse>, ApiError> {
    validate_synthesis_request(&req, state.config.max_text_chars)?;
    validate_single_shot(&req.text, state.relay.max_segment_chars())?;

    let audio = state.relay.run_single(&req.text, &req.options).await?;
    state.metrics.relay.record_segments(1, audio.len());

    Ok(Json(SingleShotResponse {
        audio_base64: base64::engine::general_purpose::STANDARD.encode(&audio),
        encoding: req.options.extension().to_string(),
        bytes: audio.len(),
    }))
}

fn record<T>(state: &AppState, endpoint: &EndpointMetrics, start: Instant, result: &Result<T, ApiError>) {
    endpoint.record_request(start.elapsed().as_millis() as u64);
    if let Err(e) = result {
        endpoint.record_error();
        if matches!(e, ApiError::Upstream(_)) {
            state.metrics.relay.record_upstream_error();
        }
    }
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<DetailedMetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.refresh_memory();

    // Get CPU usage (average across all cores)
    let cpu_usage = system.global_cpu_info().cpu_usage();

    let memory_used = system.used_memory();
    let memory_total = system.total_memory();
    let memory_usage_percent = if memory_total > 0 {
        (memory_used as f64 / memory_total as f64 * 100.0) as f32
    } else {
        0.0
    };

    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    // Unix-like systems only
    let system_load = {
        #[cfg(unix)]
        {
            std::fs::read_to_string("/proc/loadavg")
                .ok()
                .and_then(|loadavg| loadavg.split_whitespace().next().and_then(|s| s.parse::<f64>().ok()))
        }
        #[cfg(not(unix))]
        None
    };

    Json(DetailedMetricsResponse {
        timestamp: chrono::Utc::now(),
        system: SystemMetrics {
            cpu_usage_percent: cpu_usage,
            memory_used_mb: memory_used / 1024 / 1024,
            memory_total_mb: memory_total / 1024 / 1024,
            memory_usage_percent,
            uptime_seconds: uptime,
            system_load,
        },
        endpoints: EndpointMetricsResponse {
            tts: state.metrics.tts.stats(),
            tts_single: state.metrics.tts_single.stats(),
        },
        relay: state.metrics.relay.snapshot(),
    })
}
