use crate::conversation::SessionConfig;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioSettings,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub stream_url: String,
    pub api_base_url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_backoff_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            stream_url: self.server.stream_url.clone(),
            api_base_url: self.server.api_base_url.clone(),
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            frame_size: self.audio.frame_size,
            max_reconnect_attempts: self.server.max_reconnect_attempts,
            reconnect_backoff_ms: self.server.reconnect_backoff_ms,
        }
    }
}
