use super::config::SessionConfig;
use super::log::ChatMessage;
use super::stats::SessionStats;
use crate::audio::{CaptureBackend, CapturePipeline};
use crate::error::VoiceResult;
use crate::playback::SpeechPlayer;
use crate::ws::{InboundEvent, StreamClient, StreamState, Transport};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events surfaced to the presentation layer
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    /// A message was appended to the conversation log
    MessageAppended(ChatMessage),

    /// A non-fatal error the user should see
    Error(String),

    /// The assistant flagged this conversation for human follow-up
    InterventionNeeded,
}

/// A voice conversation session that manages audio capture, the
/// streaming connection, the conversation log, and reply playback
pub struct VoiceSession {
    /// Session configuration
    config: SessionConfig,

    /// Connection factory for the streaming endpoint
    transport: Arc<dyn Transport>,

    /// Microphone capture and frame forwarding
    capture: CapturePipeline,

    /// Synthesized reply playback
    player: Arc<SpeechPlayer>,

    /// Streaming connection, present while the session is active
    client: Option<StreamClient>,

    /// Identifier of the active conversation
    conversation_uuid: Option<Uuid>,

    /// When the session started
    started_at: Option<chrono::DateTime<Utc>>,

    /// Accumulated conversation messages
    log: Arc<Mutex<Vec<ChatMessage>>>,

    /// Channel to the presentation layer
    events_tx: mpsc::UnboundedSender<ConversationEvent>,

    /// Handle for the inbound event dispatch task
    dispatch_task: Option<JoinHandle<()>>,
}

impl VoiceSession {
    /// Create a session and the presentation-event receiver that goes
    /// with it
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        capture_backend: Box<dyn CaptureBackend>,
        player: Arc<SpeechPlayer>,
    ) -> (Self, mpsc::UnboundedReceiver<ConversationEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let capture = CapturePipeline::new(config.capture_config(), capture_backend);

        (
            Self {
                config,
                transport,
                capture,
                player,
                client: None,
                conversation_uuid: None,
                started_at: None,
                log: Arc::new(Mutex::new(Vec::new())),
                events_tx,
                dispatch_task: None,
            },
            events_rx,
        )
    }

    /// Start a fresh conversation: new identifier, cleared log, open
    /// connection, live microphone.
    ///
    /// Capture and connection failures abort the start and surface
    /// immediately; nothing is left half-running.
    pub async fn start(&mut self) -> VoiceResult<Uuid> {
        if self.client.is_some() {
            warn!("conversation already active");
            return Ok(self.conversation_uuid.unwrap_or_default());
        }

        let uuid = Uuid::new_v4();
        info!("starting conversation {}", uuid);

        self.log.lock().await.clear();
        self.started_at = Some(Utc::now());

        let (client, events) =
            StreamClient::connect(Arc::clone(&self.transport), self.config.stream_config(), uuid)
                .await?;

        if let Err(e) = self
            .capture
            .start(client.frame_sender(), client.connected_handle())
            .await
        {
            error!("capture failed to start: {}", e);
            let mut client = client;
            client.close().await;
            return Err(e);
        }

        let log = Arc::clone(&self.log);
        let player = Arc::clone(&self.player);
        let ui = self.events_tx.clone();
        self.dispatch_task = Some(tokio::spawn(async move {
            Self::dispatch(events, log, player, ui).await;
        }));

        self.client = Some(client);
        self.conversation_uuid = Some(uuid);
        info!("conversation {} started", uuid);
        Ok(uuid)
    }

    /// End the conversation: stop capture, close the connection with an
    /// intentional close, and silence playback — in that order.
    /// Idempotent; repeated calls are no-ops.
    pub async fn end(&mut self) -> VoiceResult<()> {
        if self.client.is_none() && self.dispatch_task.is_none() {
            debug!("no active conversation to end");
            return Ok(());
        }

        info!("ending conversation");

        self.capture.stop().await;

        if let Some(mut client) = self.client.take() {
            client.close().await;
        }

        if let Some(task) = self.dispatch_task.take() {
            if let Err(e) = task.await {
                warn!("event dispatch task panicked: {}", e);
            }
        }

        self.player.stop().await;

        self.conversation_uuid = None;
        info!("conversation ended");
        Ok(())
    }

    /// Get the accumulated conversation log
    pub async fn conversation_log(&self) -> Vec<ChatMessage> {
        let log = self.log.lock().await;
        log.clone()
    }

    pub fn conversation_uuid(&self) -> Option<Uuid> {
        self.conversation_uuid
    }

    pub fn is_active(&self) -> bool {
        self.client.is_some()
    }

    /// State of the streaming connection, if one exists
    pub fn stream_state(&self) -> Option<StreamState> {
        self.client.as_ref().map(|c| c.state())
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let duration_secs = self
            .started_at
            .map(|started| {
                Utc::now().signed_duration_since(started).num_milliseconds() as f64 / 1000.0
            })
            .unwrap_or(0.0);

        let message_count = {
            let log = self.log.lock().await;
            log.len()
        };

        SessionStats {
            active: self.client.is_some(),
            started_at: self.started_at,
            duration_secs,
            message_count,
        }
    }

    /// Dispatch inbound events one at a time, in arrival order
    async fn dispatch(
        mut events: mpsc::Receiver<InboundEvent>,
        log: Arc<Mutex<Vec<ChatMessage>>>,
        player: Arc<SpeechPlayer>,
        ui: mpsc::UnboundedSender<ConversationEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                InboundEvent::Transcript {
                    text,
                    reply,
                    needs_intervention,
                } => {
                    let user = ChatMessage::user(text);
                    let assistant = ChatMessage::assistant(reply.clone(), needs_intervention);

                    {
                        let mut log = log.lock().await;
                        log.push(user.clone());
                        log.push(assistant.clone());
                    }

                    let _ = ui.send(ConversationEvent::MessageAppended(user));
                    let _ = ui.send(ConversationEvent::MessageAppended(assistant));

                    if needs_intervention {
                        info!("assistant flagged the conversation for human follow-up");
                        let _ = ui.send(ConversationEvent::InterventionNeeded);
                    }

                    // Playback is optional: a reply that cannot be
                    // spoken still lands in the log
                    if let Err(e) = player.speak(&reply).await {
                        warn!("reply playback unavailable: {}", e);
                        let _ = ui.send(ConversationEvent::Error(e.to_string()));
                    }
                }

                InboundEvent::Error { message } => {
                    warn!("server reported an error: {}", message);
                    let _ = ui.send(ConversationEvent::Error(message));
                }

                InboundEvent::SessionAck => {
                    debug!("server acknowledged the session");
                }
            }
        }

        debug!("inbound event stream ended");
    }
}
