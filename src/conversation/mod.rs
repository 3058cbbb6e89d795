//! Voice conversation sessions
//!
//! This module provides the `VoiceSession` abstraction that manages:
//! - Microphone capture and PCM streaming to the conversation service
//! - Inbound transcript/error event dispatch
//! - The append-only conversation log
//! - Synthesized reply playback
//! - Session statistics and lifecycle

mod config;
mod log;
mod session;
mod stats;

pub use config::SessionConfig;
pub use log::{ChatMessage, Speaker};
pub use session::{ConversationEvent, VoiceSession};
pub use stats::SessionStats;
