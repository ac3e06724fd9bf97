//! Outbound calls to the speech-synthesis provider.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client};
use serde::Serialize;

use crate::error::{RelayError, RelayResult};
use crate::params::SynthesisParams;

/// Provider endpoint used unless `DEEPGRAM_TTS_URL` overrides it.
pub const DEEPGRAM_TTS_URL: &str = "https://api.deepgram.com/v1/speak";

/// A text-to-speech backend that turns one piece of text into audio bytes.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        params: &SynthesisParams,
        timeout: Duration,
    ) -> RelayResult<Bytes>;
}

#[derive(Serialize)]
struct SpeakBody<'a> {
    text: &'a str,
}

/// HTTP client for the Deepgram speak API.
#[derive(Debug, Clone)]
pub struct DeepgramClient {
    client: Client,
    api_key: String,
    url: String,
}

impl DeepgramClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_url(api_key, DEEPGRAM_TTS_URL)
    }

    pub fn with_url(api_key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SpeechProvider for DeepgramClient {
    async fn synthesize(
        &self,
        text: &str,
        params: &SynthesisParams,
        timeout: Duration,
    ) -> RelayResult<Bytes> {
        tracing::debug!(chars = text.chars().count(), params = ?params, "sending synthesis request");

        let response = self
            .client
            .post(&self.url)
            .header(header::AUTHORIZATION, format!("Token {}", self.api_key))
            .query(params)
            .json(&SpeakBody { text })
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "provider rejected synthesis request");
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?)
    }
}
