pub mod api;
pub mod audio;
pub mod config;
pub mod conversation;
pub mod error;
pub mod playback;
pub mod ws;

pub use api::{HttpSynthesizer, Synthesizer, UploadClient, UploadResponse};
pub use audio::{CaptureBackend, CaptureConfig, CapturePipeline, CaptureState, CpalCapture};
pub use config::Config;
pub use conversation::{
    ChatMessage, ConversationEvent, SessionConfig, SessionStats, Speaker, VoiceSession,
};
pub use error::{VoiceError, VoiceResult};
pub use playback::{PlaybackBackend, PlaybackHandle, PlaybackSink, RodioOutput, SpeechPlayer};
pub use ws::{InboundEvent, StreamClient, StreamConfig, StreamState, Transport, WsTransport};
