use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether the session is currently active
    pub active: bool,

    /// When the session started
    pub started_at: Option<DateTime<Utc>>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of messages in the conversation log
    pub message_count: usize,
}
