//! Microphone capture and the frame-and-forward pipeline.
//!
//! A `CaptureBackend` owns the platform input device and emits raw float
//! sample blocks. The `CapturePipeline` frames those blocks into
//! fixed-size chunks, encodes them to 16-bit PCM, and forwards each
//! encoded frame to the transport while it reports itself connected.
//! Frames produced while the transport is down are dropped, not queued:
//! live audio has no replay value.

use crate::audio::pcm;
use crate::error::{VoiceError, VoiceResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// What we request from the input device.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture sample rate (the transcription service expects 16 kHz)
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Samples per outbound frame
    pub frame_size: usize,
    /// Request device-side echo cancellation where the backend supports it
    pub echo_cancellation: bool,
    /// Request device-side noise suppression where the backend supports it
    pub noise_suppression: bool,
    /// Request automatic gain control where the backend supports it
    pub auto_gain: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_size: 4096,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain: true,
        }
    }
}

/// Capture pipeline lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
    Stopped,
}

/// Audio capture backend trait
///
/// Implementations:
/// - `CpalCapture`: microphone via the platform's default input device
/// - test doubles that replay scripted sample blocks
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver of raw float sample blocks. Block
    /// sizes are whatever the device delivers; framing happens in the
    /// pipeline.
    async fn start(&mut self) -> VoiceResult<mpsc::Receiver<Vec<f32>>>;

    /// Stop capturing and release the device. Idempotent.
    async fn stop(&mut self) -> VoiceResult<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Microphone capture via cpal.
///
/// The cpal input stream is not `Send`, so it lives on a dedicated
/// thread for the lifetime of the capture; stopping joins that thread,
/// which drops the stream and releases the device.
pub struct CpalCapture {
    config: CaptureConfig,
    stop_flag: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CpalCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// List available input devices
    pub fn list_input_devices() -> VoiceResult<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;

        let mut device_names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                device_names.push(name);
            }
        }

        Ok(device_names)
    }

    fn run_stream(
        config: CaptureConfig,
        stop_flag: Arc<AtomicBool>,
        samples_tx: mpsc::Sender<Vec<f32>>,
        ready_tx: oneshot::Sender<VoiceResult<()>>,
    ) {
        let device = match cpal::default_host().default_input_device() {
            Some(device) => device,
            None => {
                let _ = ready_tx.send(Err(VoiceError::Capture(
                    "no input device available".to_string(),
                )));
                return;
            }
        };

        info!(
            "using input device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );
        debug!(
            "requested processing: echo_cancellation={}, noise_suppression={}, auto_gain={} (not applied by this backend)",
            config.echo_cancellation, config.noise_suppression, config.auto_gain
        );

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let callback_stop = Arc::clone(&stop_flag);
        let stream = match device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if callback_stop.load(Ordering::Relaxed) {
                    return;
                }
                // try_send keeps the realtime callback non-blocking; a
                // backed-up consumer loses samples rather than stalling
                if samples_tx.try_send(data.to_vec()).is_err() {
                    debug!("capture consumer backed up, dropping {} samples", data.len());
                }
            },
            move |err| {
                warn!("input stream error: {}", err);
            },
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(e.into()));
                return;
            }
        };

        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(e.into()));
            return;
        }

        let _ = ready_tx.send(Ok(()));

        while !stop_flag.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        // Dropping the stream releases the device
        drop(stream);
    }
}

#[async_trait::async_trait]
impl CaptureBackend for CpalCapture {
    async fn start(&mut self) -> VoiceResult<mpsc::Receiver<Vec<f32>>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(VoiceError::Capture(
                "microphone is already in use by this session".to_string(),
            ));
        }

        info!(
            "acquiring microphone ({} Hz, {} channel{})",
            self.config.sample_rate,
            self.config.channels,
            if self.config.channels == 1 { "" } else { "s" }
        );

        let (samples_tx, samples_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.stop_flag.store(false, Ordering::SeqCst);
        let config = self.config.clone();
        let stop_flag = Arc::clone(&self.stop_flag);

        let thread = std::thread::spawn(move || {
            Self::run_stream(config, stop_flag, samples_tx, ready_tx);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.thread = Some(thread);
                self.capturing.store(true, Ordering::SeqCst);
                info!("microphone capture started");
                Ok(samples_rx)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(VoiceError::Capture(
                    "capture thread exited before the stream came up".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> VoiceResult<()> {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.capturing.store(false, Ordering::SeqCst);

        if let Some(thread) = self.thread.take() {
            let joined = tokio::task::spawn_blocking(move || thread.join()).await;
            match joined {
                Ok(Ok(())) => info!("microphone released"),
                Ok(Err(_)) => warn!("capture thread panicked during shutdown"),
                Err(e) => warn!("failed to join capture thread: {}", e),
            }
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

/// Frames raw sample blocks into fixed-size encoded frames and forwards
/// them to the transport.
pub struct CapturePipeline {
    config: CaptureConfig,
    backend: Box<dyn CaptureBackend>,
    state: CaptureState,
    stopped: Arc<AtomicBool>,
    stop_notify: Arc<tokio::sync::Notify>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl CapturePipeline {
    pub fn new(config: CaptureConfig, backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            config,
            backend,
            state: CaptureState::Idle,
            stopped: Arc::new(AtomicBool::new(false)),
            stop_notify: Arc::new(tokio::sync::Notify::new()),
            task: None,
        }
    }

    /// Start capturing and forwarding frames.
    ///
    /// `frames` receives one encoded frame per `frame_size` samples, in
    /// capture order, while `transport_open` is true. On device failure
    /// the pipeline stays idle and the error is returned to the caller.
    pub async fn start(
        &mut self,
        frames: mpsc::Sender<Vec<u8>>,
        transport_open: Arc<AtomicBool>,
    ) -> VoiceResult<()> {
        if self.state == CaptureState::Capturing {
            warn!("capture already running");
            return Ok(());
        }

        let mut samples_rx = self.backend.start().await?;
        info!("capture pipeline started ({} backend)", self.backend.name());

        self.stopped.store(false, Ordering::SeqCst);
        // Fresh notify per start so a permit left over from an earlier
        // stop cannot kill the new forwarder
        self.stop_notify = Arc::new(tokio::sync::Notify::new());
        let stopped = Arc::clone(&self.stopped);
        let stop_notify = Arc::clone(&self.stop_notify);
        let frame_size = self.config.frame_size;

        let task = tokio::spawn(async move {
            let mut pending: Vec<f32> = Vec::with_capacity(frame_size * 2);

            loop {
                let block = tokio::select! {
                    biased;
                    _ = stop_notify.notified() => break,
                    maybe_block = samples_rx.recv() => match maybe_block {
                        Some(block) => block,
                        None => break,
                    },
                };

                // Blocks that arrive after a stop request are dropped,
                // never queued across the stopped boundary
                if stopped.load(Ordering::SeqCst) {
                    debug!("capture stopped, dropping {} samples", block.len());
                    continue;
                }

                pending.extend_from_slice(&block);

                while pending.len() >= frame_size {
                    let chunk: Vec<f32> = pending.drain(..frame_size).collect();

                    if stopped.load(Ordering::SeqCst) {
                        break;
                    }

                    if !transport_open.load(Ordering::SeqCst) {
                        debug!("transport not open, dropping {}-sample frame", frame_size);
                        continue;
                    }

                    let encoded = pcm::to_le_bytes(&pcm::encode(&chunk));
                    if let Err(e) = frames.send(encoded).await {
                        error!("frame channel closed, stopping forwarder: {}", e);
                        return;
                    }
                }
            }

            debug!("capture sample stream ended");
        });

        self.task = Some(task);
        self.state = CaptureState::Capturing;
        Ok(())
    }

    /// Stop capturing: detach the framing tap and release the device.
    ///
    /// Safe to call repeatedly; later calls are no-ops.
    pub async fn stop(&mut self) {
        if self.state != CaptureState::Capturing {
            debug!("capture pipeline already stopped");
            return;
        }

        info!("stopping capture pipeline");
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_one();

        if let Err(e) = self.backend.stop().await {
            warn!("capture backend failed to stop cleanly: {}", e);
        }

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("capture forwarder task panicked: {}", e);
            }
        }

        self.state = CaptureState::Stopped;
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }
}
