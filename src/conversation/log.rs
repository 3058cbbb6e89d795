use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry in the conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub speaker: Speaker,

    pub text: String,

    /// When this message was appended
    pub timestamp: DateTime<Utc>,

    /// Set on assistant messages when the reply should be escalated to
    /// a human
    pub needs_intervention: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            timestamp: Utc::now(),
            needs_intervention: false,
        }
    }

    pub fn assistant(text: impl Into<String>, needs_intervention: bool) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            needs_intervention,
        }
    }
}
