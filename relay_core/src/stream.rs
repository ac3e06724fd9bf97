//! Streamed-mode composition.
//!
//! Each segment's audio is yielded as soon as the provider returns it, so the
//! receiver sees an append-only byte stream rather than one buffered blob. A
//! pause of `stream_gap` separates segments; none follows the last one.

use bytes::Bytes;
use futures_core::Stream;

use crate::dispatch::{pause, Dispatcher};
use crate::error::RelayResult;
use crate::params::SynthesisParams;
use crate::pipeline::{PipelineRun, Stage};

/// Stream the audio for `segments` in order, ending at the first error.
pub fn stream_segments(
    dispatcher: Dispatcher,
    segments: Vec<String>,
    params: SynthesisParams,
    mut run: PipelineRun,
) -> impl Stream<Item = RelayResult<Bytes>> + Send + 'static {
    async_stream::try_stream! {
        let total = segments.len();
        let gap = dispatcher.pacing().stream_gap;

        for (index, segment) in segments.iter().enumerate() {
            run.advance(Stage::Dispatching { segment: index + 1, total })?;

            let audio = match dispatcher.dispatch_one(index, total, segment, &params).await {
                Ok(audio) => audio,
                Err(e) => Err(run.fail(e))?,
            };
            yield audio;

            if index + 1 < total {
                pause(gap).await;
            }
        }

        run.advance(Stage::Composing)?;
        run.advance(Stage::Done)?;
        tracing::info!(segments = total, "stream complete");
    }
}
