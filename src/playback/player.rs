//! Speech playback with single-stream arbitration.
//!
//! Exactly one synthesized reply may be audible at a time. The playback
//! slot is guarded by a stop-before-start rule: `speak` always releases
//! whatever is playing before a new stream may claim the slot, so a
//! second `speak` during playback is the defined preemption path rather
//! than an error.

use crate::api::Synthesizer;
use crate::error::VoiceResult;
use crate::playback::sink::{PlaybackBackend, PlaybackHandle};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Plays synthesized speech, one stream at a time
pub struct SpeechPlayer {
    synthesizer: Arc<dyn Synthesizer>,
    output: Arc<dyn PlaybackBackend>,
    current: Mutex<Option<PlaybackHandle>>,
}

impl SpeechPlayer {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, output: Arc<dyn PlaybackBackend>) -> Self {
        Self {
            synthesizer,
            output,
            current: Mutex::new(None),
        }
    }

    /// Synthesize `text` and play it, preempting any active stream.
    ///
    /// Synthesis failure leaves the previous stream stopped and is
    /// reported to the caller as a non-fatal error; the conversation
    /// continues without audio.
    pub async fn speak(&self, text: &str) -> VoiceResult<()> {
        // Stop-before-start: the slot must be free before synthesis
        self.stop().await;

        let audio = self.synthesizer.synthesize(text).await?;
        if audio.is_empty() {
            debug!("synthesis returned no audio, skipping playback");
            return Ok(());
        }

        let sink = self.output.play(audio)?;

        let mut current = self.current.lock().await;
        // A racing speak may have claimed the slot while we synthesized;
        // the newest stream wins
        if let Some(mut previous) = current.replace(PlaybackHandle::new(sink)) {
            previous.release();
        }

        info!("playing synthesized reply");
        Ok(())
    }

    /// Halt playback and release the slot. A no-op when idle, safe to
    /// call at any time.
    pub async fn stop(&self) {
        let mut current = self.current.lock().await;
        if let Some(mut handle) = current.take() {
            handle.release();
            info!("playback stopped");
        }
    }

    /// True while a synthesized reply is audible
    pub async fn is_playing(&self) -> bool {
        let current = self.current.lock().await;
        current.as_ref().map(|h| h.is_active()).unwrap_or(false)
    }
}
