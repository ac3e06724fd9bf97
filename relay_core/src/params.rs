//! Provider query parameters built from the caller's synthesis options.

use serde::{Deserialize, Serialize};

/// Voice used when the caller does not name one.
pub const DEFAULT_VOICE: &str = "aura-luna-en";
/// Encoding used when the caller does not name one.
pub const DEFAULT_ENCODING: &str = "mp3";

const DEFAULT_SAMPLE_RATE: u32 = 48_000;
const DEFAULT_BIT_RATE: u32 = 192_000;
const DEFAULT_SPEED: f64 = 0.7;
const DEFAULT_PITCH: f64 = 0.0;
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_UTTERANCE_END_MS: u32 = 1000;
const DEFAULT_CALLBACK_METHOD: &str = "POST";

/// Encodings whose sample rate is fixed by the provider; these take a bit rate.
const RATE_FIXED_ENCODINGS: [&str; 3] = ["mp3", "aac", "opus"];
/// The only bit rates the provider accepts for mp3.
const MP3_BIT_RATES: [u32; 2] = [32_000, 48_000];
const MP3_FALLBACK_BIT_RATE: u32 = 48_000;

const MAX_SEGMENT_SPEED: f64 = 1.2;
const DEFAULT_SEGMENT_SPEED: f64 = 0.95;
const MIN_SEGMENT_UTTERANCE_END_MS: u32 = 800;
const DEFAULT_SEGMENT_UTTERANCE_END_MS: u32 = 1200;

/// Caller-supplied synthesis configuration.
///
/// A field left out of the JSON body takes its default; an explicit `null`
/// leaves it `None`, so [`build_params`] applies its absence rules instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    #[serde(default = "default_voice")]
    pub voice: Option<String>,
    #[serde(default = "default_encoding")]
    pub encoding: Option<String>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: Option<u32>,
    #[serde(default = "default_bit_rate")]
    pub bit_rate: Option<u32>,
    #[serde(default = "default_speed")]
    pub speed: Option<f64>,
    #[serde(default = "default_pitch")]
    pub pitch: Option<f64>,
    #[serde(default = "default_language")]
    pub language: Option<String>,
    #[serde(default = "enabled")]
    pub punctuate: Option<bool>,
    #[serde(default = "default_utterance_end_ms")]
    pub utterance_end_ms: Option<u32>,
    #[serde(default = "enabled")]
    pub filler_words: Option<bool>,
    #[serde(default = "enabled")]
    pub smart_format: Option<bool>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default = "default_callback_method")]
    pub callback_method: Option<String>,
}

fn default_voice() -> Option<String> {
    Some(DEFAULT_VOICE.to_string())
}

fn default_encoding() -> Option<String> {
    Some(DEFAULT_ENCODING.to_string())
}

fn default_sample_rate() -> Option<u32> {
    Some(DEFAULT_SAMPLE_RATE)
}

fn default_bit_rate() -> Option<u32> {
    Some(DEFAULT_BIT_RATE)
}

fn default_speed() -> Option<f64> {
    Some(DEFAULT_SPEED)
}

fn default_pitch() -> Option<f64> {
    Some(DEFAULT_PITCH)
}

fn default_language() -> Option<String> {
    Some(DEFAULT_LANGUAGE.to_string())
}

fn enabled() -> Option<bool> {
    Some(true)
}

fn default_utterance_end_ms() -> Option<u32> {
    Some(DEFAULT_UTTERANCE_END_MS)
}

fn default_callback_method() -> Option<String> {
    Some(DEFAULT_CALLBACK_METHOD.to_string())
}

/// The options an empty JSON object deserializes to.
impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            encoding: default_encoding(),
            sample_rate: default_sample_rate(),
            bit_rate: default_bit_rate(),
            speed: default_speed(),
            pitch: default_pitch(),
            language: default_language(),
            punctuate: enabled(),
            utterance_end_ms: default_utterance_end_ms(),
            filler_words: enabled(),
            smart_format: enabled(),
            callback_url: None,
            callback_method: default_callback_method(),
        }
    }
}

impl SynthesisOptions {
    /// Every field absent, as if the caller sent `null` for all of them.
    pub fn unset() -> Self {
        Self {
            voice: None,
            encoding: None,
            sample_rate: None,
            bit_rate: None,
            speed: None,
            pitch: None,
            language: None,
            punctuate: None,
            utterance_end_ms: None,
            filler_words: None,
            smart_format: None,
            callback_url: None,
            callback_method: None,
        }
    }

    /// Trimmed encoding, if one was given.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    /// File extension for archive entries.
    pub fn extension(&self) -> &str {
        self.encoding().unwrap_or(DEFAULT_ENCODING)
    }
}

/// Which request shape is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// One call per segment of a chunked request. Speed is capped and
    /// utterance-end silence floored for more natural pacing.
    Segmented,
    /// A single call for the whole text; speed and silence pass through as-is.
    SingleShot,
}

/// Ordered query parameters for one provider call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SynthesisParams(Vec<(&'static str, String)>);

impl SynthesisParams {
    fn set(&mut self, key: &'static str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Provider parameters driven by the filler-words flag.
///
/// One flag controls filler words, disfluencies and hesitations together.
pub fn filler_word_params(flag: Option<bool>) -> Vec<(&'static str, String)> {
    match flag {
        Some(enabled) => ["filler_words", "disfluencies", "hesitations"]
            .into_iter()
            .map(|key| (key, enabled.to_string()))
            .collect(),
        None => Vec::new(),
    }
}

/// Build the query parameters for one provider call.
pub fn build_params(options: &SynthesisOptions, profile: Profile) -> SynthesisParams {
    let mut params = SynthesisParams::default();

    if let Some(voice) = options.voice.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        params.set("model", voice);
    }

    let encoding = options.encoding();
    let lower = encoding.map(str::to_ascii_lowercase);
    if let Some(encoding) = encoding {
        params.set("encoding", encoding);
    }

    if let Some(lower) = lower.as_deref() {
        let rate_fixed = RATE_FIXED_ENCODINGS.contains(&lower);

        if let Some(sample_rate) = options.sample_rate.filter(|r| *r > 0) {
            if !rate_fixed {
                params.set("sample_rate", sample_rate);
            }
        }

        if let Some(bit_rate) = options.bit_rate.filter(|r| *r > 0) {
            if rate_fixed {
                let bit_rate = if lower == "mp3" && !MP3_BIT_RATES.contains(&bit_rate) {
                    MP3_FALLBACK_BIT_RATE
                } else {
                    bit_rate
                };
                params.set("bit_rate", bit_rate);
            }
        }
    }

    match profile {
        Profile::Segmented => {
            let speed = options
                .speed
                .map(|s| s.min(MAX_SEGMENT_SPEED))
                .unwrap_or(DEFAULT_SEGMENT_SPEED);
            params.set("speed", speed);
        }
        Profile::SingleShot => {
            if let Some(speed) = options.speed {
                params.set("speed", speed);
            }
        }
    }

    if let Some(pitch) = options.pitch {
        params.set("pitch", pitch);
    }
    if let Some(language) = options.language.as_deref().filter(|l| !l.is_empty()) {
        params.set("language", language);
    }
    if let Some(punctuate) = options.punctuate {
        params.set("punctuate", punctuate);
    }

    match profile {
        Profile::Segmented => {
            let silence = options
                .utterance_end_ms
                .map(|ms| ms.max(MIN_SEGMENT_UTTERANCE_END_MS))
                .unwrap_or(DEFAULT_SEGMENT_UTTERANCE_END_MS);
            params.set("utterance_end_ms", silence);
        }
        Profile::SingleShot => {
            if let Some(ms) = options.utterance_end_ms {
                params.set("utterance_end_ms", ms);
            }
        }
    }

    for (key, value) in filler_word_params(options.filler_words) {
        params.set(key, value);
    }

    if let Some(smart_format) = options.smart_format {
        params.set("smart_format", smart_format);
    }

    if let Some(url) = options.callback_url.as_deref().filter(|u| !u.is_empty()) {
        params.set("callback_url", url);
        if let Some(method) = options.callback_method.as_deref().filter(|m| !m.is_empty()) {
            params.set("callback_method", method.to_lowercase());
        }
    }

    // mp3 is containerless for the provider, so only wav and ogg name one.
    match lower.as_deref() {
        Some("wav") => params.set("container", "wav"),
        Some("ogg") => params.set("container", "ogg"),
        _ => {}
    }

    params
}
