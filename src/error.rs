//! Error types for the voice conversation client

use thiserror::Error;

/// Result type alias for voice client operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while running a voice conversation
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Microphone unavailable or denied. Fatal to starting a session.
    #[error("audio capture error: {0}")]
    Capture(String),

    /// Initial connect failure. Reported to the caller, never auto-retried.
    #[error("connection error: {0}")]
    Connection(String),

    /// Malformed inbound payload. The connection stays open.
    #[error("malformed server payload: {0}")]
    Parse(String),

    /// TTS request failure. Non-fatal: the conversation continues without audio.
    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    /// Output device or decode failure. Non-fatal, like synthesis errors.
    #[error("audio playback error: {0}")]
    Playback(String),

    #[error("upload error: {0}")]
    Upload(String),

    /// Retry ceiling reached. The user must start a new session.
    #[error("reconnect attempts exhausted after {0} failures")]
    ReconnectExhausted(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<cpal::DevicesError> for VoiceError {
    fn from(err: cpal::DevicesError) -> Self {
        VoiceError::Capture(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for VoiceError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        VoiceError::Capture(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for VoiceError {
    fn from(err: cpal::BuildStreamError) -> Self {
        VoiceError::Capture(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for VoiceError {
    fn from(err: cpal::PlayStreamError) -> Self {
        VoiceError::Capture(err.to_string())
    }
}
