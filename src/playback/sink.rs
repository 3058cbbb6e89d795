//! Playback output seam and the release-once handle.
//!
//! The output device sits behind a trait so tests can observe the
//! one-stream-at-a-time rule without real audio hardware. In production
//! a rodio sink plays the synthesized bytes; the rodio output stream is
//! not `Send`, so it is parked on its own thread for the lifetime of
//! the process.

use crate::error::{VoiceError, VoiceResult};
use std::io::Cursor;
use tracing::{info, warn};

/// One live synthesized-speech stream
pub trait PlaybackSink: Send {
    /// Halt output and reset the playback position. Safe to call more
    /// than once.
    fn halt(&mut self);

    /// True while audio is still queued or playing
    fn is_active(&self) -> bool;
}

/// Starts playback of decoded audio bytes
pub trait PlaybackBackend: Send + Sync {
    fn play(&self, audio: Vec<u8>) -> VoiceResult<Box<dyn PlaybackSink>>;
}

/// Owns the live sink and guarantees the underlying resource is
/// released exactly once across natural completion, explicit stop, and
/// preemption. A second release is a no-op.
pub struct PlaybackHandle {
    sink: Option<Box<dyn PlaybackSink>>,
}

impl PlaybackHandle {
    pub fn new(sink: Box<dyn PlaybackSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Halt playback and release the sink. Idempotent.
    pub fn release(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.halt();
        }
    }

    pub fn is_active(&self) -> bool {
        self.sink.as_ref().map(|s| s.is_active()).unwrap_or(false)
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Speaker output via rodio
pub struct RodioOutput {
    handle: rodio::OutputStreamHandle,
    // Dropping this sender ends the keep-alive thread, which drops the
    // output stream and releases the device
    _keepalive: std::sync::mpsc::Sender<()>,
}

impl RodioOutput {
    /// Open the default output device
    pub fn new() -> VoiceResult<Self> {
        let (handle_tx, handle_rx) = std::sync::mpsc::channel();
        let (keepalive_tx, keepalive_rx) = std::sync::mpsc::channel::<()>();

        // The OutputStream is not Send; build it on a dedicated thread
        // and keep it alive there until the client shuts down
        std::thread::spawn(move || {
            let (stream, stream_handle) = match rodio::OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    let _ = handle_tx.send(Err(VoiceError::Playback(e.to_string())));
                    return;
                }
            };
            let _ = handle_tx.send(Ok(stream_handle));

            // Block until the owning RodioOutput is dropped
            let _ = keepalive_rx.recv();
            drop(stream);
        });

        let handle = handle_rx
            .recv()
            .map_err(|_| VoiceError::Playback("output thread exited".to_string()))??;

        info!("speaker output ready");
        Ok(Self {
            handle,
            _keepalive: keepalive_tx,
        })
    }
}

impl PlaybackBackend for RodioOutput {
    fn play(&self, audio: Vec<u8>) -> VoiceResult<Box<dyn PlaybackSink>> {
        let sink = rodio::Sink::try_new(&self.handle)
            .map_err(|e| VoiceError::Playback(e.to_string()))?;

        let source = rodio::Decoder::new(Cursor::new(audio))
            .map_err(|e| VoiceError::Playback(format!("decode failed: {}", e)))?;

        sink.append(source);
        Ok(Box::new(RodioSink { sink }))
    }
}

struct RodioSink {
    sink: rodio::Sink,
}

impl PlaybackSink for RodioSink {
    fn halt(&mut self) {
        if !self.sink.empty() {
            warn!("halting in-flight playback");
        }
        // stop() clears the queue and resets the position
        self.sink.stop();
    }

    fn is_active(&self) -> bool {
        !self.sink.empty()
    }
}
