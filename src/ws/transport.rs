//! Transport seam between the session protocol and the wire.
//!
//! The protocol state machine talks to a split sink/stream pair behind
//! traits so integration tests can drive it with in-process fakes; the
//! production implementation is a tokio-tungstenite WebSocket.

use crate::error::{VoiceError, VoiceResult};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Close code for an intentional shutdown
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Close code reported when a connection dies without a close frame
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// A message read off the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Vec<u8>),
    /// Peer closed the connection; 1000 signals a clean shutdown
    Closed { code: u16 },
}

/// Connection factory
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn connect(
        &self,
        url: &str,
    ) -> VoiceResult<(Box<dyn TransportSink>, Box<dyn TransportStream>)>;
}

/// Write half of an open connection
#[async_trait::async_trait]
pub trait TransportSink: Send {
    async fn send_text(&mut self, text: String) -> VoiceResult<()>;
    async fn send_binary(&mut self, payload: Vec<u8>) -> VoiceResult<()>;
    /// Send a normal-close frame
    async fn close(&mut self) -> VoiceResult<()>;
}

/// Read half of an open connection
#[async_trait::async_trait]
pub trait TransportStream: Send {
    /// Next inbound message; `None` when the stream ends without a
    /// close frame
    async fn next_message(&mut self) -> Option<VoiceResult<WireMessage>>;
}

/// WebSocket transport
#[derive(Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

type WsInner = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn connect(
        &self,
        url: &str,
    ) -> VoiceResult<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))?;
        let (sink, stream) = stream.split();
        Ok((Box::new(WsSink { inner: sink }), Box::new(WsStream { inner: stream })))
    }
}

struct WsSink {
    inner: SplitSink<WsInner, Message>,
}

#[async_trait::async_trait]
impl TransportSink for WsSink {
    async fn send_text(&mut self, text: String) -> VoiceResult<()> {
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))
    }

    async fn send_binary(&mut self, payload: Vec<u8>) -> VoiceResult<()> {
        self.inner
            .send(Message::Binary(payload))
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))
    }

    async fn close(&mut self) -> VoiceResult<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client shutdown".into(),
        };
        self.inner
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| VoiceError::Connection(e.to_string()))
    }
}

struct WsStream {
    inner: SplitStream<WsInner>,
}

#[async_trait::async_trait]
impl TransportStream for WsStream {
    async fn next_message(&mut self) -> Option<VoiceResult<WireMessage>> {
        loop {
            return match self.inner.next().await {
                Some(Ok(Message::Text(text))) => Some(Ok(WireMessage::Text(text))),
                Some(Ok(Message::Binary(payload))) => Some(Ok(WireMessage::Binary(payload))),
                Some(Ok(Message::Close(frame))) => {
                    // 1005 = no status code present on the wire
                    let code = frame.map(|f| u16::from(f.code)).unwrap_or(1005);
                    Some(Ok(WireMessage::Closed { code }))
                }
                // Ping/pong is handled by the library
                Some(Ok(_)) => continue,
                Some(Err(e)) => Some(Err(VoiceError::Connection(e.to_string()))),
                None => None,
            };
        }
    }
}
