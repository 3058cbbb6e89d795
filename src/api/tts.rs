//! Speech synthesis client.
//!
//! The synthesis service takes the reply text as a URL-encoded query
//! parameter and answers with playable audio bytes; any non-2xx status
//! is a synthesis failure, which callers treat as non-fatal.

use crate::error::{VoiceError, VoiceResult};
use tracing::debug;

/// Turns text into playable audio bytes
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;
}

/// HTTP synthesis backend
pub struct HttpSynthesizer {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let url = format!(
            "{}/api/text-to-speech",
            self.base_url.trim_end_matches('/')
        );
        debug!("requesting synthesis of {} characters", text.len());

        let response = self
            .client
            .get(&url)
            .query(&[("text", text)])
            .header(reqwest::header::ACCEPT, "audio/*")
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VoiceError::Synthesis(format!(
                "synthesis request failed: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
        debug!("synthesis returned {} bytes of audio", bytes.len());
        Ok(bytes.to_vec())
    }
}
