use crate::audio::CaptureConfig;
use crate::ws::StreamConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a voice conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Streaming endpoint for live audio
    pub stream_url: String,

    /// Base URL for the synthesis and upload services
    pub api_base_url: String,

    /// Capture sample rate (the transcription service expects 16 kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Samples per outbound audio frame
    pub frame_size: usize,

    /// Reconnect ceiling after abnormal closures
    pub max_reconnect_attempts: u32,

    /// Fixed wait between reconnect attempts, in milliseconds
    pub reconnect_backoff_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stream_url: "ws://localhost:8080/ws/audio-stream-native".to_string(),
            api_base_url: "http://localhost:8080".to_string(),
            sample_rate: 16000,
            channels: 1,
            frame_size: 4096,
            max_reconnect_attempts: 5,
            reconnect_backoff_ms: 1000,
        }
    }
}

impl SessionConfig {
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            url: self.stream_url.clone(),
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            frame_size: self.frame_size,
            ..CaptureConfig::default()
        }
    }
}
