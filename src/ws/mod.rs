//! WebSocket session protocol
//!
//! This module owns the streaming connection to the conversation
//! service:
//! - `StreamClient`: connect, handshake, pump frames/events, bounded
//!   reconnection, intentional close
//! - wire message types and inbound event parsing
//! - the transport seam (tokio-tungstenite in production, fakes in
//!   tests)

pub mod client;
pub mod messages;
pub mod transport;

pub use client::{StreamClient, StreamConfig, StreamState};
pub use messages::{InboundEvent, ServerMessage, StreamStart};
pub use transport::{
    Transport, TransportSink, TransportStream, WireMessage, WsTransport, ABNORMAL_CLOSE_CODE,
    NORMAL_CLOSE_CODE,
};
