//! Session protocol for the audio streaming connection.
//!
//! `StreamClient` owns one conversation's connection: it connects, sends
//! the start-of-stream handshake, pumps outbound PCM frames and inbound
//! events, and reconnects after abnormal closures with a fixed backoff
//! and a bounded attempt counter. An intentional `close()` clears the
//! conversation identifier first, so no reconnect can ever follow it.

use crate::error::{VoiceError, VoiceResult};
use crate::ws::messages::{InboundEvent, StreamStart};
use crate::ws::transport::{
    Transport, TransportSink, TransportStream, WireMessage, ABNORMAL_CLOSE_CODE, NORMAL_CLOSE_CODE,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Connection lifecycle for one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Handshaking,
    Streaming,
    Reconnecting,
    Closing,
}

/// Streaming connection settings
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket endpoint for live audio
    pub url: String,
    /// Reconnect ceiling after abnormal closures
    pub max_reconnect_attempts: u32,
    /// Fixed (non-exponential) wait between reconnect attempts
    pub reconnect_backoff: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws/audio-stream-native".to_string(),
            max_reconnect_attempts: 5,
            reconnect_backoff: Duration::from_secs(1),
        }
    }
}

struct StreamShared {
    state: Mutex<StreamState>,
    /// True only while Streaming over an open transport; the capture
    /// pipeline holds a clone and gates frame forwarding on it
    connected: Arc<AtomicBool>,
    /// Set by `close()` before anything else, so in-flight close events
    /// can never trigger a reconnect
    closing: AtomicBool,
    /// Cleared by `close()`; reconnection requires it
    conversation_uuid: Mutex<Option<uuid::Uuid>>,
}

impl StreamShared {
    fn set_state(&self, state: StreamState) {
        let mut current = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *current = state;
    }

    fn state(&self) -> StreamState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn conversation_uuid(&self) -> Option<uuid::Uuid> {
        *self
            .conversation_uuid
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

enum PumpOutcome {
    /// Peer closed with the normal code, or the local side requested it
    CleanClose,
    /// `close()` was called
    LocalClose,
    /// Non-clean closure or transport failure; candidate for reconnect
    Abnormal(u16),
}

/// One conversation's streaming connection
pub struct StreamClient {
    shared: Arc<StreamShared>,
    frames_tx: mpsc::Sender<Vec<u8>>,
    control_tx: mpsc::Sender<()>,
    run_task: Option<JoinHandle<()>>,
}

impl StreamClient {
    /// Connect, send the start-of-stream handshake, and spawn the pump
    /// loop. Initial connect or handshake failure surfaces to the caller
    /// and is never retried; only later abnormal closures reconnect.
    ///
    /// Returns the client and the ordered stream of inbound events.
    pub async fn connect(
        transport: Arc<dyn Transport>,
        config: StreamConfig,
        conversation_uuid: uuid::Uuid,
    ) -> VoiceResult<(Self, mpsc::Receiver<InboundEvent>)> {
        let shared = Arc::new(StreamShared {
            state: Mutex::new(StreamState::Disconnected),
            connected: Arc::new(AtomicBool::new(false)),
            closing: AtomicBool::new(false),
            conversation_uuid: Mutex::new(Some(conversation_uuid)),
        });

        let (sink, stream) = match Self::open(&shared, transport.as_ref(), &config).await {
            Ok(pair) => pair,
            Err(e) => {
                shared.set_state(StreamState::Disconnected);
                return Err(e);
            }
        };

        shared.set_state(StreamState::Streaming);
        shared.connected.store(true, Ordering::SeqCst);
        info!("session {} streaming", conversation_uuid);

        let (frames_tx, frames_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(64);
        let (control_tx, control_rx) = mpsc::channel(1);

        let run_task = tokio::spawn(Self::run(
            Arc::clone(&shared),
            transport,
            config,
            sink,
            stream,
            frames_rx,
            control_rx,
            events_tx,
        ));

        Ok((
            Self {
                shared,
                frames_tx,
                control_tx,
                run_task: Some(run_task),
            },
            events_rx,
        ))
    }

    /// Sender for outbound encoded audio frames
    pub fn frame_sender(&self) -> mpsc::Sender<Vec<u8>> {
        self.frames_tx.clone()
    }

    /// Flag the capture pipeline checks before forwarding a frame
    pub fn connected_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.connected)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    /// Intentional shutdown: clears the conversation identifier, sends a
    /// normal-close frame, and waits for the pump loop to finish. No
    /// reconnect will ever follow, regardless of in-flight close events.
    /// Idempotent.
    pub async fn close(&mut self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
        {
            let mut uuid = self
                .shared
                .conversation_uuid
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            *uuid = None;
        }
        self.shared.set_state(StreamState::Closing);

        let _ = self.control_tx.send(()).await;

        if let Some(task) = self.run_task.take() {
            if let Err(e) = task.await {
                warn!("stream pump task panicked: {}", e);
            }
        }

        self.shared.set_state(StreamState::Disconnected);
        info!("streaming connection closed");
    }

    /// Connect and fire off the handshake (no acknowledgment is awaited;
    /// audio may flow immediately).
    async fn open(
        shared: &StreamShared,
        transport: &dyn Transport,
        config: &StreamConfig,
    ) -> VoiceResult<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
        let Some(conversation_uuid) = shared.conversation_uuid() else {
            return Err(VoiceError::Connection(
                "session identifier cleared, refusing to connect".to_string(),
            ));
        };

        shared.set_state(StreamState::Connecting);
        info!("connecting to {}", config.url);
        let (mut sink, stream) = transport.connect(&config.url).await?;

        shared.set_state(StreamState::Handshaking);
        let hello = serde_json::to_string(&StreamStart::new(conversation_uuid))
            .map_err(|e| VoiceError::Connection(e.to_string()))?;
        sink.send_text(hello).await?;
        debug!("sent start_streaming handshake for {}", conversation_uuid);

        Ok((sink, stream))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        shared: Arc<StreamShared>,
        transport: Arc<dyn Transport>,
        config: StreamConfig,
        mut sink: Box<dyn TransportSink>,
        mut stream: Box<dyn TransportStream>,
        mut frames_rx: mpsc::Receiver<Vec<u8>>,
        mut control_rx: mpsc::Receiver<()>,
        events_tx: mpsc::Sender<InboundEvent>,
    ) {
        let mut attempts: u32 = 0;

        loop {
            let outcome = Self::pump(
                &shared,
                sink.as_mut(),
                stream.as_mut(),
                &mut frames_rx,
                &mut control_rx,
                &events_tx,
            )
            .await;
            shared.connected.store(false, Ordering::SeqCst);

            match outcome {
                PumpOutcome::LocalClose => {
                    shared.set_state(StreamState::Disconnected);
                    return;
                }
                PumpOutcome::CleanClose => {
                    info!("connection closed cleanly");
                    shared.set_state(StreamState::Disconnected);
                    return;
                }
                PumpOutcome::Abnormal(code) => {
                    warn!("connection closed abnormally (code {})", code);
                    shared.set_state(StreamState::Reconnecting);
                    Self::discard_stale_frames(&mut frames_rx);

                    // Explicit bounded retry loop; a failed attempt
                    // consumes one slot just like an abnormal closure
                    loop {
                        if shared.closing.load(Ordering::SeqCst) {
                            shared.set_state(StreamState::Disconnected);
                            return;
                        }
                        if attempts >= config.max_reconnect_attempts {
                            error!("{}", VoiceError::ReconnectExhausted(attempts));
                            shared.set_state(StreamState::Disconnected);
                            return;
                        }

                        attempts += 1;
                        info!(
                            "reconnecting in {:?} (attempt {}/{})",
                            config.reconnect_backoff, attempts, config.max_reconnect_attempts
                        );
                        tokio::time::sleep(config.reconnect_backoff).await;

                        if shared.closing.load(Ordering::SeqCst) {
                            shared.set_state(StreamState::Disconnected);
                            return;
                        }

                        match Self::open(&shared, transport.as_ref(), &config).await {
                            Ok((new_sink, new_stream)) => {
                                sink = new_sink;
                                stream = new_stream;
                                // Anything queued during the backoff is
                                // stale audio; start the new stream clean
                                Self::discard_stale_frames(&mut frames_rx);
                                shared.set_state(StreamState::Streaming);
                                shared.connected.store(true, Ordering::SeqCst);
                                attempts = 0;
                                info!("reconnected, resuming stream");
                                break;
                            }
                            Err(e) => {
                                warn!("reconnect attempt {} failed: {}", attempts, e);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Pump one live connection until it closes or the user asks to.
    async fn pump(
        shared: &StreamShared,
        sink: &mut dyn TransportSink,
        stream: &mut dyn TransportStream,
        frames_rx: &mut mpsc::Receiver<Vec<u8>>,
        control_rx: &mut mpsc::Receiver<()>,
        events_tx: &mpsc::Sender<InboundEvent>,
    ) -> PumpOutcome {
        loop {
            tokio::select! {
                maybe_signal = control_rx.recv() => {
                    if maybe_signal.is_none() {
                        debug!("client handle dropped, closing connection");
                    } else {
                        info!("closing connection at user request");
                    }
                    if let Err(e) = sink.close().await {
                        debug!("close frame send failed: {}", e);
                    }
                    return PumpOutcome::LocalClose;
                }

                maybe_frame = frames_rx.recv() => {
                    let Some(frame) = maybe_frame else {
                        // All frame senders dropped with the client still
                        // alive; nothing left to forward
                        return PumpOutcome::LocalClose;
                    };
                    if !shared.connected.load(Ordering::SeqCst) {
                        debug!("transport not open, discarding audio frame");
                        continue;
                    }
                    if let Err(e) = sink.send_binary(frame).await {
                        warn!("audio frame send failed: {}", e);
                        return PumpOutcome::Abnormal(ABNORMAL_CLOSE_CODE);
                    }
                }

                maybe_msg = stream.next_message() => {
                    match maybe_msg {
                        Some(Ok(WireMessage::Text(text))) => {
                            Self::dispatch_text(&text, events_tx).await;
                        }
                        Some(Ok(WireMessage::Binary(_))) => {
                            debug!("ignoring binary server frame");
                        }
                        Some(Ok(WireMessage::Closed { code })) => {
                            return if code == NORMAL_CLOSE_CODE {
                                PumpOutcome::CleanClose
                            } else {
                                PumpOutcome::Abnormal(code)
                            };
                        }
                        Some(Err(e)) => {
                            warn!("transport error: {}", e);
                            return PumpOutcome::Abnormal(ABNORMAL_CLOSE_CODE);
                        }
                        None => {
                            warn!("connection ended without a close frame");
                            return PumpOutcome::Abnormal(ABNORMAL_CLOSE_CODE);
                        }
                    }
                }
            }
        }
    }

    /// Parse and forward one inbound text frame. Parse failures are
    /// reported on the event channel but never close the connection.
    async fn dispatch_text(text: &str, events_tx: &mpsc::Sender<InboundEvent>) {
        match InboundEvent::parse(text) {
            Ok(Some(event)) => {
                if events_tx.send(event).await.is_err() {
                    debug!("event receiver dropped, discarding inbound event");
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("failed to parse server message: {}", e);
                let report = InboundEvent::Error {
                    message: "failed to parse server response".to_string(),
                };
                if events_tx.send(report).await.is_err() {
                    debug!("event receiver dropped, discarding parse report");
                }
            }
        }
    }

    /// Frames captured before a disconnect are worthless once the moment
    /// has passed; drop whatever queued up while the pump was down.
    fn discard_stale_frames(frames_rx: &mut mpsc::Receiver<Vec<u8>>) {
        let mut dropped = 0usize;
        while frames_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("discarded {} stale audio frames", dropped);
        }
    }
}
