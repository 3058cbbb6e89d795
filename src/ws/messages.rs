use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// First client-to-server text frame, declaring intent to stream audio
/// for a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStart {
    #[serde(rename = "type")]
    pub kind: String,
    pub conversation_uuid: String,
}

impl StreamStart {
    pub fn new(conversation_uuid: Uuid) -> Self {
        Self {
            kind: "start_streaming".to_string(),
            conversation_uuid: conversation_uuid.to_string(),
        }
    }
}

/// Raw server-to-client text frame
///
/// The service tags every message with `type`; fields beyond the tag are
/// optional so one struct covers all variants.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(rename = "needsHumanIntervention", default)]
    pub needs_human_intervention: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Parsed inbound event dispatched to the conversation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A finished transcription with the assistant's reply
    Transcript {
        text: String,
        reply: String,
        needs_intervention: bool,
    },
    /// Server-side failure the user should see
    Error { message: String },
    /// The server acknowledged the stream-start handshake
    SessionAck,
}

impl InboundEvent {
    /// Parse a server text frame.
    ///
    /// Unrecognized tags yield `Ok(None)` and are ignored rather than
    /// rejected; only malformed JSON is an error.
    pub fn parse(raw: &str) -> VoiceResult<Option<InboundEvent>> {
        let msg: ServerMessage =
            serde_json::from_str(raw).map_err(|e| VoiceError::Parse(e.to_string()))?;

        match msg.kind.as_str() {
            "transcript" => {
                let (Some(text), Some(reply)) = (msg.transcript, msg.reply) else {
                    debug!("transcript message missing text or reply, ignoring");
                    return Ok(None);
                };
                Ok(Some(InboundEvent::Transcript {
                    text,
                    reply,
                    needs_intervention: msg.needs_human_intervention.unwrap_or(false),
                }))
            }
            "error" => Ok(Some(InboundEvent::Error {
                message: msg
                    .error
                    .or(msg.message)
                    .unwrap_or_else(|| "unspecified server error".to_string()),
            })),
            "ack" | "start_streaming_ack" => Ok(Some(InboundEvent::SessionAck)),
            other => {
                debug!("ignoring server message with unrecognized tag: {}", other);
                Ok(None)
            }
        }
    }
}
