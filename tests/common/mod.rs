// Shared test doubles for driving the streaming, capture, and playback
// machinery without real devices or a real server.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use voiceline::error::{VoiceError, VoiceResult};
use voiceline::ws::{Transport, TransportSink, TransportStream, WireMessage};
use voiceline::{CaptureBackend, PlaybackBackend, PlaybackSink, Synthesizer};

// ============================================================================
// Transport
// ============================================================================

/// Everything the client wrote, across all connections, in order
#[derive(Debug, Clone, PartialEq)]
pub enum MockWrite {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

enum ConnectScript {
    Fail,
    Ok(mpsc::UnboundedReceiver<VoiceResult<WireMessage>>),
}

/// Scripted transport: each `connect` consumes the next script entry.
/// An exhausted script fails the connect.
pub struct MockTransport {
    scripts: Mutex<VecDeque<ConnectScript>>,
    connect_count: AtomicUsize,
    writes: Arc<Mutex<Vec<MockWrite>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(VecDeque::new()),
            connect_count: AtomicUsize::new(0),
            writes: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Queue a successful connection. Returns the server-side sender
    /// used to inject inbound messages and closures.
    pub fn script_ok(&self) -> mpsc::UnboundedSender<VoiceResult<WireMessage>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts
            .lock()
            .unwrap()
            .push_back(ConnectScript::Ok(rx));
        tx
    }

    /// Queue a failed connection attempt
    pub fn script_fail(&self) {
        self.scripts.lock().unwrap().push_back(ConnectScript::Fail);
    }

    pub fn connects(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<MockWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn binary_write_count(&self) -> usize {
        self.writes()
            .iter()
            .filter(|w| matches!(w, MockWrite::Binary(_)))
            .count()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(
        &self,
        _url: &str,
    ) -> VoiceResult<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(ConnectScript::Ok(rx)) => Ok((
                Box::new(MockSinkHalf {
                    writes: Arc::clone(&self.writes),
                }),
                Box::new(MockStreamHalf { rx }),
            )),
            Some(ConnectScript::Fail) | None => Err(VoiceError::Connection(
                "scripted connect failure".to_string(),
            )),
        }
    }
}

struct MockSinkHalf {
    writes: Arc<Mutex<Vec<MockWrite>>>,
}

#[async_trait::async_trait]
impl TransportSink for MockSinkHalf {
    async fn send_text(&mut self, text: String) -> VoiceResult<()> {
        self.writes.lock().unwrap().push(MockWrite::Text(text));
        Ok(())
    }

    async fn send_binary(&mut self, payload: Vec<u8>) -> VoiceResult<()> {
        self.writes.lock().unwrap().push(MockWrite::Binary(payload));
        Ok(())
    }

    async fn close(&mut self) -> VoiceResult<()> {
        self.writes.lock().unwrap().push(MockWrite::Close);
        Ok(())
    }
}

struct MockStreamHalf {
    rx: mpsc::UnboundedReceiver<VoiceResult<WireMessage>>,
}

#[async_trait::async_trait]
impl TransportStream for MockStreamHalf {
    async fn next_message(&mut self) -> Option<VoiceResult<WireMessage>> {
        self.rx.recv().await
    }
}

// ============================================================================
// Capture
// ============================================================================

/// Capture backend fed by the test instead of a microphone. Restartable:
/// each `start` opens a fresh sample channel behind the same feeder.
pub struct StubCapture {
    feeder_slot: Arc<Mutex<Option<mpsc::Sender<Vec<f32>>>>>,
    capturing: Arc<AtomicBool>,
    fail_start: bool,
}

/// Test-side handle for feeding sample blocks into a `StubCapture`
#[derive(Clone)]
pub struct StubFeeder {
    slot: Arc<Mutex<Option<mpsc::Sender<Vec<f32>>>>>,
}

impl StubFeeder {
    /// Feed one block; returns false when capture is not running
    pub async fn send(&self, samples: Vec<f32>) -> bool {
        let tx = { self.slot.lock().unwrap().clone() };
        match tx {
            Some(tx) => tx.send(samples).await.is_ok(),
            None => false,
        }
    }
}

impl StubCapture {
    /// Backend plus the feeder used to push sample blocks into it
    pub fn new() -> (Self, StubFeeder) {
        let slot = Arc::new(Mutex::new(None));
        (
            Self {
                feeder_slot: Arc::clone(&slot),
                capturing: Arc::new(AtomicBool::new(false)),
                fail_start: false,
            },
            StubFeeder { slot },
        )
    }

    /// Backend whose device acquisition always fails
    pub fn failing() -> Self {
        Self {
            feeder_slot: Arc::new(Mutex::new(None)),
            capturing: Arc::new(AtomicBool::new(false)),
            fail_start: true,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for StubCapture {
    async fn start(&mut self) -> VoiceResult<mpsc::Receiver<Vec<f32>>> {
        if self.fail_start {
            return Err(VoiceError::Capture("no input device available".to_string()));
        }
        let (tx, rx) = mpsc::channel(64);
        *self.feeder_slot.lock().unwrap() = Some(tx);
        self.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> VoiceResult<()> {
        // Dropping the sender closes the sample stream, like releasing
        // the device
        *self.feeder_slot.lock().unwrap() = None;
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ============================================================================
// Synthesis and playback
// ============================================================================

/// Synthesizer returning canned audio bytes, or failing on demand
pub struct MockSynthesizer {
    calls: Arc<Mutex<Vec<String>>>,
    audio: Vec<u8>,
    fail: AtomicBool,
}

impl MockSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            audio: vec![1, 2, 3, 4],
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::Synthesis("scripted synthesis failure".to_string()));
        }
        Ok(self.audio.clone())
    }
}

/// Observable state of one sink the mock output created
#[derive(Clone)]
pub struct SinkProbe {
    pub active: Arc<AtomicBool>,
    pub halt_count: Arc<AtomicUsize>,
}

impl SinkProbe {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn halts(&self) -> usize {
        self.halt_count.load(Ordering::SeqCst)
    }
}

/// Playback backend that records a probe for every sink it hands out
pub struct MockOutput {
    sinks: Arc<Mutex<Vec<SinkProbe>>>,
}

impl MockOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sinks: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn sinks(&self) -> Vec<SinkProbe> {
        self.sinks.lock().unwrap().clone()
    }

    /// Number of sinks still playing
    pub fn active_count(&self) -> usize {
        self.sinks().iter().filter(|p| p.is_active()).count()
    }
}

impl PlaybackBackend for MockOutput {
    fn play(&self, _audio: Vec<u8>) -> VoiceResult<Box<dyn PlaybackSink>> {
        let probe = SinkProbe {
            active: Arc::new(AtomicBool::new(true)),
            halt_count: Arc::new(AtomicUsize::new(0)),
        };
        self.sinks.lock().unwrap().push(probe.clone());
        Ok(Box::new(ProbeSink { probe }))
    }
}

struct ProbeSink {
    probe: SinkProbe,
}

impl PlaybackSink for ProbeSink {
    fn halt(&mut self) {
        self.probe.halt_count.fetch_add(1, Ordering::SeqCst);
        self.probe.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.probe.is_active()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Poll `check` until it reports true, panicking after two seconds
pub async fn eventually(mut check: impl FnMut() -> bool, what: &str) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}
