//! Text-to-speech relay core.
//!
//! Cleans caller text, splits it into provider-sized segments, synthesizes
//! each segment with paced, sequential provider calls, and composes the
//! results into a zip archive or a live byte stream.

mod archive;
mod dispatch;
mod error;
mod normalize;
mod params;
mod pipeline;
mod provider;
mod segment;
mod stream;

pub use archive::{Archive, ARCHIVE_FILENAME};
pub use dispatch::{Dispatcher, Pacing};
pub use error::{RelayError, RelayResult};
pub use normalize::normalize;
pub use params::{
    build_params, filler_word_params, Profile, SynthesisOptions, SynthesisParams, DEFAULT_ENCODING,
    DEFAULT_VOICE,
};
pub use pipeline::{PipelineRun, Relay, Stage};
pub use provider::{DeepgramClient, SpeechProvider, DEEPGRAM_TTS_URL};
pub use segment::{split_into_segments, split_sentences, DEFAULT_MAX_SEGMENT_CHARS};
pub use stream::stream_segments;

/// Response mode requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// All parts packaged into one zip download.
    #[default]
    File,
    /// Parts appended to a single audio stream as they are produced.
    Stream,
}

/// Inbound synthesis request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    #[serde(default, deserialize_with = "mode_or_default")]
    pub mode: Mode,
    #[serde(flatten)]
    pub options: SynthesisOptions,
}

// `"mode": null` means file mode.
fn mode_or_default<'de, D>(deserializer: D) -> Result<Mode, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mode: Option<Mode> = serde::Deserialize::deserialize(deserializer)?;
    Ok(mode.unwrap_or_default())
}

/// MIME type for audio in `encoding`.
pub fn content_type_for(encoding: &str) -> &'static str {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" | "linear16" => "audio/wav",
        "ogg" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "mulaw" | "alaw" => "audio/basic",
        _ => "application/octet-stream",
    }
}
