//! The per-request relay pipeline.
//!
//! A request moves `Received -> Normalizing -> Segmenting -> Dispatching(1..=N)
//! -> Composing -> Done`. A provider failure while dispatching, or an archive
//! failure while composing, moves it to `Failed`, which drops every blob
//! collected so far: a failed run never produces output. [`PipelineRun`] enforces these transitions.

use std::sync::Arc;

use bytes::Bytes;
use futures_core::Stream;
use tracing::info;

use crate::archive::Archive;
use crate::dispatch::{Dispatcher, Pacing};
use crate::error::{RelayError, RelayResult};
use crate::normalize::normalize;
use crate::params::{build_params, Profile, SynthesisOptions};
use crate::provider::SpeechProvider;
use crate::segment::{split_into_segments, DEFAULT_MAX_SEGMENT_CHARS};
use crate::stream::stream_segments;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Normalizing,
    Segmenting,
    /// 1-based segment currently being synthesized.
    Dispatching { segment: usize, total: usize },
    Composing,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    fn allows(&self, next: &Stage) -> bool {
        use Stage::*;
        match (*self, *next) {
            (Received, Normalizing) | (Normalizing, Segmenting) => true,
            (Segmenting, Dispatching { segment: 1, total }) => total >= 1,
            (Dispatching { segment, total }, Dispatching { segment: following, total: same }) => {
                total == same && following == segment + 1 && following <= total
            }
            (Dispatching { segment, total }, Composing) => segment == total,
            (Dispatching { .. }, Failed) | (Composing, Failed) => true,
            (Composing, Done) => true,
            _ => false,
        }
    }
}

/// State of one request moving through the pipeline.
#[derive(Debug)]
pub struct PipelineRun {
    stage: Stage,
    history: Vec<Stage>,
    blobs: Vec<Bytes>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            stage: Stage::Received,
            history: vec![Stage::Received],
            blobs: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Every stage visited so far, in order.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Audio collected for composition so far.
    pub fn collected(&self) -> usize {
        self.blobs.len()
    }

    pub fn advance(&mut self, next: Stage) -> RelayResult<()> {
        if !self.stage.allows(&next) {
            return Err(RelayError::InvalidTransition {
                from: self.stage,
                to: next,
            });
        }
        self.stage = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed`, discard collected audio, and hand back `err`.
    pub fn fail(&mut self, err: RelayError) -> RelayError {
        if !self.stage.is_terminal() {
            self.stage = Stage::Failed;
            self.history.push(Stage::Failed);
        }
        self.blobs.clear();
        err
    }

    fn collect(&mut self, blob: Bytes) {
        self.blobs.push(blob);
    }

    fn take_blobs(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.blobs)
    }
}

/// Normalizes, segments and synthesizes text through a [`SpeechProvider`].
#[derive(Clone)]
pub struct Relay {
    segmented: Dispatcher,
    single_shot: Dispatcher,
    max_segment_chars: usize,
}

impl Relay {
    pub fn new(provider: Arc<dyn SpeechProvider>, pacing: Pacing, max_segment_chars: usize) -> Self {
        Self {
            segmented: Dispatcher::new(provider.clone(), pacing),
            single_shot: Dispatcher::new(provider, Pacing::single_shot()),
            max_segment_chars: max_segment_chars.max(1),
        }
    }

    /// Relay with the default pacing and segment size.
    pub fn with_defaults(provider: Arc<dyn SpeechProvider>) -> Self {
        Self::new(provider, Pacing::segmented(), DEFAULT_MAX_SEGMENT_CHARS)
    }

    pub fn max_segment_chars(&self) -> usize {
        self.max_segment_chars
    }

    pub fn pacing(&self) -> Pacing {
        self.segmented.pacing()
    }

    /// Segments `text` would be sent as.
    pub fn segments_for(&self, text: &str) -> Vec<String> {
        split_into_segments(&normalize(text), self.max_segment_chars)
    }

    fn prepare(&self, run: &mut PipelineRun, text: &str) -> RelayResult<Vec<String>> {
        run.advance(Stage::Normalizing)?;
        let normalized = normalize(text);
        run.advance(Stage::Segmenting)?;
        let segments = split_into_segments(&normalized, self.max_segment_chars);
        info!(
            chars = normalized.chars().count(),
            segments = segments.len(),
            "text segmented"
        );
        Ok(segments)
    }

    /// Synthesize every segment and package the parts as an [`Archive`].
    pub async fn run_batch(&self, text: &str, options: &SynthesisOptions) -> RelayResult<Archive> {
        let mut run = PipelineRun::new();
        self.run_batch_with(&mut run, text, options).await
    }

    /// Like [`Relay::run_batch`], recording progress in `run`.
    pub async fn run_batch_with(
        &self,
        run: &mut PipelineRun,
        text: &str,
        options: &SynthesisOptions,
    ) -> RelayResult<Archive> {
        let segments = self.prepare(run, text)?;
        let params = build_params(options, Profile::Segmented);
        let total = segments.len();

        for (index, segment) in segments.iter().enumerate() {
            run.advance(Stage::Dispatching { segment: index + 1, total })?;
            match self.segmented.dispatch_one(index, total, segment, &params).await {
                Ok(audio) => run.collect(audio),
                Err(e) => return Err(run.fail(e)),
            }
        }

        run.advance(Stage::Composing)?;
        let blobs = run.take_blobs();
        let archive = Archive::pack(options.extension(), blobs).map_err(|e| run.fail(e))?;
        run.advance(Stage::Done)?;
        info!(parts = archive.len(), "batch complete");
        Ok(archive)
    }

    /// Stream each segment's audio as soon as it is synthesized.
    pub fn run_stream(
        &self,
        text: &str,
        options: &SynthesisOptions,
    ) -> RelayResult<impl Stream<Item = RelayResult<Bytes>> + Send + 'static> {
        let mut run = PipelineRun::new();
        let segments = self.prepare(&mut run, text)?;
        let params = build_params(options, Profile::Segmented);
        Ok(stream_segments(self.segmented.clone(), segments, params, run))
    }

    /// Synthesize the whole normalized text in one provider call.
    pub async fn run_single(&self, text: &str, options: &SynthesisOptions) -> RelayResult<Bytes> {
        let normalized = normalize(text);
        let params = build_params(options, Profile::SingleShot);
        self.single_shot.dispatch_one(0, 1, &normalized, &params).await
    }
}
