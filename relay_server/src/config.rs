// Configuration constants for the server

use std::time::Duration;

use relay_core::{Pacing, DEEPGRAM_TTS_URL, DEFAULT_MAX_SEGMENT_CHARS};

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub voice_token: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub deepgram_url: String,
    pub rate_limit_per_minute: u32,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub max_text_chars: usize,
    pub max_segment_chars: usize,
    pub pre_call_delay_ms: u64,
    pub post_call_delay_ms: u64,
    pub stream_gap_ms: u64,
    pub provider_timeout_secs: u64,
}

// Secrets stay out of logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("voice_token", &self.voice_token.as_ref().map(|_| "<set>"))
            .field("deepgram_api_key", &self.deepgram_api_key.as_ref().map(|_| "<set>"))
            .field("deepgram_url", &self.deepgram_url)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("max_text_chars", &self.max_text_chars)
            .field("max_segment_chars", &self.max_segment_chars)
            .field("pacing", &self.pacing())
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let pacing = Pacing::segmented();
        Self {
            port: 8085,
            voice_token: None,
            deepgram_api_key: None,
            deepgram_url: DEEPGRAM_TTS_URL.to_string(),
            rate_limit_per_minute: 60,
            cors_allowed_origins: None,
            max_text_chars: 100_000,
            max_segment_chars: DEFAULT_MAX_SEGMENT_CHARS,
            pre_call_delay_ms: pacing.pre_call.as_millis() as u64,
            post_call_delay_ms: pacing.post_call.as_millis() as u64,
            stream_gap_ms: pacing.stream_gap.as_millis() as u64,
            provider_timeout_secs: pacing.call_timeout.as_secs(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_secret(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            voice_token: env_secret("VOICE_TOKEN"),
            deepgram_api_key: env_secret("DEEPGRAM_API_KEY"),
            deepgram_url: env_secret("DEEPGRAM_TTS_URL").unwrap_or(defaults.deepgram_url),
            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_per_minute),
            cors_allowed_origins,
            max_text_chars: env_parse("MAX_TEXT_CHARS").unwrap_or(defaults.max_text_chars),
            max_segment_chars: env_parse("MAX_SEGMENT_CHARS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_segment_chars),
            pre_call_delay_ms: env_parse("PRE_CALL_DELAY_MS").unwrap_or(defaults.pre_call_delay_ms),
            post_call_delay_ms: env_parse("POST_CALL_DELAY_MS")
                .unwrap_or(defaults.post_call_delay_ms),
            stream_gap_ms: env_parse("STREAM_GAP_MS").unwrap_or(defaults.stream_gap_ms),
            provider_timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS")
                .filter(|n: &u64| *n > 0)
                .unwrap_or(defaults.provider_timeout_secs),
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            pre_call: Duration::from_millis(self.pre_call_delay_ms),
            post_call: Duration::from_millis(self.post_call_delay_ms),
            stream_gap: Duration::from_millis(self.stream_gap_ms),
            call_timeout: self.provider_timeout(),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}
