// Metrics collection and tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

const MAX_LATENCY_SAMPLES: usize = 1000;

/// Per-endpoint metrics
#[derive(Debug, Clone)]
pub struct EndpointMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub total_latency_ms: Arc<AtomicU64>,
    pub min_latency_ms: Arc<AtomicU64>,
    pub max_latency_ms: Arc<AtomicU64>,
    // Sliding window of recent latencies for percentiles
    pub latency_samples: Arc<Mutex<Vec<u64>>>,
}

impl EndpointMetrics {
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            total_latency_ms: Arc::new(AtomicU64::new(0)),
            min_latency_ms: Arc::new(AtomicU64::new(u64::MAX)),
            max_latency_ms: Arc::new(AtomicU64::new(0)),
            latency_samples: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn record_request(&self, latency_ms: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.min_latency_ms.fetch_min(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);

        if let Ok(mut samples) = self.latency_samples.lock() {
            samples.push(latency_ms);
            if samples.len() > MAX_LATENCY_SAMPLES {
                samples.remove(0);
            }
        }
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    pub fn percentile(&self, p: u8) -> u64 {
        if let Ok(samples) = self.latency_samples.lock() {
            if samples.is_empty() {
                return 0;
            }
            let mut sorted = samples.clone();
            sorted.sort_unstable();
            let index = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
            sorted[index]
        } else {
            0
        }
    }

    pub fn stats(&self) -> EndpointStats {
        let min = self.min_latency_ms.load(Ordering::Relaxed);
        EndpointStats {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            avg_latency_ms: self.avg_latency_ms(),
            min_latency_ms: if min == u64::MAX { 0 } else { min },
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            p50_latency_ms: self.percentile(50),
            p95_latency_ms: self.percentile(95),
            p99_latency_ms: self.percentile(99),
        }
    }
}

impl Default for EndpointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Relay-specific counters
#[derive(Debug, Clone, Default)]
pub struct RelayMetrics {
    pub auth_failures: Arc<AtomicU64>,
    pub segments_dispatched: Arc<AtomicU64>,
    pub upstream_errors: Arc<AtomicU64>,
    pub audio_bytes: Arc<AtomicU64>,
}

impl RelayMetrics {
    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segments(&self, segments: usize, audio_bytes: usize) {
        self.segments_dispatched.fetch_add(segments as u64, Ordering::Relaxed);
        self.audio_bytes.fetch_add(audio_bytes as u64, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RelayMetricsResponse {
        RelayMetricsResponse {
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            segments_dispatched: self.segments_dispatched.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            audio_bytes: self.audio_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Comprehensive metrics structure
#[derive(Debug, Clone, Default)]
pub struct AppMetrics {
    pub tts: EndpointMetrics,
    pub tts_single: EndpointMetrics,
    pub relay: RelayMetrics,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Serialize)]
pub struct DetailedMetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub system: SystemMetrics,
    pub endpoints: EndpointMetricsResponse,
    pub relay: RelayMetricsResponse,
}

#[derive(Serialize)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f32,
    pub uptime_seconds: u64,
    pub system_load: Option<f64>,
}

#[derive(Serialize)]
pub struct EndpointMetricsResponse {
    pub tts: EndpointStats,
    pub tts_single: EndpointStats,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct EndpointStats {
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct RelayMetricsResponse {
    pub auth_failures: u64,
    pub segments_dispatched: u64,
    pub upstream_errors: u64,
    pub audio_bytes: u64,
}
