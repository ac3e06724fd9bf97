//! Sequential, paced calls to the provider.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{error, info};

use crate::error::RelayResult;
use crate::params::SynthesisParams;
use crate::provider::SpeechProvider;

/// Delays and timeout around provider calls.
///
/// The segmented values are product tuning rather than measured provider
/// limits; the server lets each be overridden from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Wait before every call.
    pub pre_call: Duration,
    /// Wait after every successful call.
    pub post_call: Duration,
    /// Extra wait between segments of a streamed response.
    pub stream_gap: Duration,
    /// Timeout for a single provider call.
    pub call_timeout: Duration,
}

impl Pacing {
    pub const fn segmented() -> Self {
        Self {
            pre_call: Duration::from_millis(300),
            post_call: Duration::from_millis(200),
            stream_gap: Duration::from_millis(500),
            call_timeout: Duration::from_secs(45),
        }
    }

    pub const fn single_shot() -> Self {
        Self {
            pre_call: Duration::ZERO,
            post_call: Duration::ZERO,
            stream_gap: Duration::ZERO,
            call_timeout: Duration::from_secs(15),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::segmented()
    }
}

/// Issues one provider call per segment, never more than one at a time.
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn SpeechProvider>,
    pacing: Pacing,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn SpeechProvider>, pacing: Pacing) -> Self {
        Self { provider, pacing }
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Synthesize segment `index` (0-based) of `total`.
    pub async fn dispatch_one(
        &self,
        index: usize,
        total: usize,
        segment: &str,
        params: &SynthesisParams,
    ) -> RelayResult<Bytes> {
        info!(
            segment = index + 1,
            total,
            preview = %preview(segment),
            "dispatching segment"
        );

        pause(self.pacing.pre_call).await;

        let audio = self
            .provider
            .synthesize(segment, params, self.pacing.call_timeout)
            .await
            .inspect_err(|e| error!(segment = index + 1, total, "segment failed: {e}"))?;

        pause(self.pacing.post_call).await;
        Ok(audio)
    }

    /// Synthesize every segment in order, stopping at the first failure.
    pub async fn dispatch_all(
        &self,
        segments: &[String],
        params: &SynthesisParams,
    ) -> RelayResult<Vec<Bytes>> {
        let total = segments.len();
        let mut blobs = Vec::with_capacity(total);
        for (index, segment) in segments.iter().enumerate() {
            blobs.push(self.dispatch_one(index, total, segment, params).await?);
        }
        Ok(blobs)
    }
}

pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn preview(segment: &str) -> String {
    let mut out: String = segment.chars().take(50).collect();
    if segment.chars().nth(50).is_some() {
        out.push_str("...");
    }
    out
}
