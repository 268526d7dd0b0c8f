//! Test doubles for the platform seams.
//!
//! `MockPlatform` counts live handles so tests can assert that nothing leaks,
//! and can hold acquisition or finalization open to exercise cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, EncodingFormat, FrequencyFrame, StreamInfo};
use crate::models::error::CaptureError;
use crate::models::recording::{PlaybackSource, Recording};
use crate::models::state::SessionState;
use crate::traits::analysis::{AnalysisProvider, Analyser};
use crate::traits::capture_delegate::SessionDelegate;
use crate::traits::capture_provider::{CaptureProvider, ChunkCallback, Encoder, InputStream};
use crate::traits::visualization::VisualizationSink;

/// Poll `cond` for up to two seconds.
pub(crate) fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[derive(Default)]
pub(crate) struct Counters {
    live_streams: AtomicUsize,
    live_analysers: AtomicUsize,
    live_encoders: AtomicUsize,
    stream_releases: AtomicUsize,
    finalize_calls: AtomicUsize,
    streams_at_flush: Mutex<Vec<usize>>,
}

struct Gate(Mutex<Option<Receiver<()>>>);

impl Gate {
    fn new() -> Self {
        Self(Mutex::new(None))
    }

    fn close(&self) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        *self.0.lock() = Some(rx);
        tx
    }

    /// Block until the paired sender fires or is dropped.
    fn pass(&self) {
        let rx = self.0.lock().take();
        if let Some(rx) = rx {
            let _ = rx.recv();
        }
    }
}

pub(crate) struct MockPlatform {
    counters: Arc<Counters>,
    capture_error: Mutex<Option<CaptureError>>,
    analysis_error: Mutex<Option<CaptureError>>,
    encoder_error: Mutex<Option<CaptureError>>,
    finalize_error: Arc<Mutex<Option<CaptureError>>>,
    supported: Vec<EncodingFormat>,
    acquire_gate: Gate,
    finalize_gate: Arc<Gate>,
    last_on_data: Mutex<Option<ChunkCallback>>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            counters: Arc::new(Counters::default()),
            capture_error: Mutex::new(None),
            analysis_error: Mutex::new(None),
            encoder_error: Mutex::new(None),
            finalize_error: Arc::new(Mutex::new(None)),
            supported: vec![EncodingFormat::Pcm16, EncodingFormat::Float32],
            acquire_gate: Gate::new(),
            finalize_gate: Arc::new(Gate::new()),
            last_on_data: Mutex::new(None),
        })
    }

    pub fn fail_capture_with(&self, err: CaptureError) {
        *self.capture_error.lock() = Some(err);
    }

    pub fn allow_capture(&self) {
        *self.capture_error.lock() = None;
    }

    pub fn fail_analysis_with(&self, err: CaptureError) {
        *self.analysis_error.lock() = Some(err);
    }

    pub fn fail_encoder_with(&self, err: CaptureError) {
        *self.encoder_error.lock() = Some(err);
    }

    pub fn fail_finalize_with(&self, err: CaptureError) {
        *self.finalize_error.lock() = Some(err);
    }

    /// The next `request_capture` blocks until the returned sender fires.
    pub fn hold_acquisition(&self) -> Sender<()> {
        self.acquire_gate.close()
    }

    /// The next `finalize` blocks until the returned sender fires.
    pub fn hold_finalize(&self) -> Sender<()> {
        self.finalize_gate.close()
    }

    /// Deliver a chunk through the most recent encoder's data callback.
    pub fn emit(&self, chunk: &[u8]) {
        let on_data = self.last_on_data.lock().clone();
        if let Some(on_data) = on_data {
            on_data(chunk);
        }
    }

    pub fn live_streams(&self) -> usize {
        self.counters.live_streams.load(Ordering::SeqCst)
    }

    pub fn live_analysers(&self) -> usize {
        self.counters.live_analysers.load(Ordering::SeqCst)
    }

    pub fn live_encoders(&self) -> usize {
        self.counters.live_encoders.load(Ordering::SeqCst)
    }

    pub fn stream_releases(&self) -> usize {
        self.counters.stream_releases.load(Ordering::SeqCst)
    }

    pub fn finalize_calls(&self) -> usize {
        self.counters.finalize_calls.load(Ordering::SeqCst)
    }

    /// Live stream count seen by each encoder flush.
    pub fn streams_at_flush(&self) -> Vec<usize> {
        self.counters.streams_at_flush.lock().clone()
    }
}

impl CaptureProvider for MockPlatform {
    fn is_available(&self) -> bool {
        true
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "mock-mic".into(),
            name: "Mock Microphone".into(),
            is_default: true,
        }
    }

    fn default_format(&self) -> EncodingFormat {
        EncodingFormat::Pcm16
    }

    fn request_capture(&self, _device_id: Option<&str>) -> Result<Box<dyn InputStream>, CaptureError> {
        self.acquire_gate.pass();
        if let Some(err) = self.capture_error.lock().clone() {
            return Err(err);
        }
        self.counters.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStream {
            counters: Arc::clone(&self.counters),
            released: false,
        }))
    }

    fn create_encoder(
        &self,
        _stream: &dyn InputStream,
        format: EncodingFormat,
        on_data: ChunkCallback,
    ) -> Result<Box<dyn Encoder>, CaptureError> {
        if let Some(err) = self.encoder_error.lock().clone() {
            return Err(err);
        }
        if !self.supported.contains(&format) {
            return Err(CaptureError::UnsupportedFormat(format));
        }
        self.counters.live_encoders.fetch_add(1, Ordering::SeqCst);
        *self.last_on_data.lock() = Some(Arc::clone(&on_data));
        Ok(Box::new(MockEncoder {
            counters: Arc::clone(&self.counters),
            format,
            on_data,
            gate: Arc::clone(&self.finalize_gate),
            error: Arc::clone(&self.finalize_error),
            paused: false,
            live: true,
        }))
    }
}

impl AnalysisProvider for MockPlatform {
    fn attach(&self, _stream: &dyn InputStream) -> Result<Box<dyn Analyser>, CaptureError> {
        if let Some(err) = self.analysis_error.lock().clone() {
            return Err(err);
        }
        self.counters.live_analysers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAnalyser {
            counters: Arc::clone(&self.counters),
            attached: true,
        }))
    }
}

struct MockStream {
    counters: Arc<Counters>,
    released: bool,
}

impl InputStream for MockStream {
    fn info(&self) -> StreamInfo {
        StreamInfo::default()
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.live_streams.fetch_sub(1, Ordering::SeqCst);
            self.counters.stream_releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub(crate) struct MockAnalyser {
    counters: Arc<Counters>,
    attached: bool,
}

impl MockAnalyser {
    /// An analyser not tied to any platform's counters.
    pub fn standalone() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            attached: false,
        }
    }
}

impl Analyser for MockAnalyser {
    fn magnitude_snapshot(&mut self) -> FrequencyFrame {
        FrequencyFrame::new(vec![0.5; 8])
    }

    fn detach(&mut self) {
        if self.attached {
            self.attached = false;
            self.counters.live_analysers.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

struct MockEncoder {
    counters: Arc<Counters>,
    format: EncodingFormat,
    on_data: ChunkCallback,
    gate: Arc<Gate>,
    error: Arc<Mutex<Option<CaptureError>>>,
    paused: bool,
    live: bool,
}

impl MockEncoder {
    fn end(&mut self) {
        if self.live {
            self.live = false;
            self.counters.live_encoders.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Encoder for MockEncoder {
    fn format(&self) -> EncodingFormat {
        self.format
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn finalize(mut self: Box<Self>) -> Result<Vec<u8>, CaptureError> {
        self.counters.finalize_calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass();
        self.end();
        if let Some(err) = self.error.lock().clone() {
            return Err(err);
        }
        let live = self.counters.live_streams.load(Ordering::SeqCst);
        self.counters.streams_at_flush.lock().push(live);
        (self.on_data)(&b"flush"[..]);
        Ok(b"!".to_vec())
    }
}

impl Drop for MockEncoder {
    fn drop(&mut self) {
        self.end();
    }
}

/// Records every delegate callback.
#[derive(Default)]
pub(crate) struct TestDelegate {
    pub states: Mutex<Vec<SessionState>>,
    pub errors: Mutex<Vec<CaptureError>>,
    pub finished: Mutex<Vec<Recording>>,
    pub fallbacks: Mutex<Vec<(EncodingFormat, EncodingFormat)>>,
    pub elapsed: Mutex<Vec<Duration>>,
    /// Live stream count at each completion callback, once `track_streams` is set.
    pub streams_at_finish: Mutex<Vec<usize>>,
    platform: Mutex<Option<Arc<MockPlatform>>>,
}

impl TestDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn track_streams(&self, platform: Arc<MockPlatform>) {
        *self.platform.lock() = Some(platform);
    }

    pub fn finished_count(&self) -> usize {
        self.finished.lock().len()
    }

    pub fn state_names(&self) -> Vec<&'static str> {
        self.states.lock().iter().map(SessionState::name).collect()
    }
}

impl SessionDelegate for TestDelegate {
    fn on_state_changed(&self, state: &SessionState) {
        self.states.lock().push(state.clone());
    }

    fn on_elapsed(&self, elapsed: Duration) {
        self.elapsed.lock().push(elapsed);
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }

    fn on_recording_finished(&self, recording: &Recording) {
        if let Some(platform) = self.platform.lock().as_ref() {
            self.streams_at_finish.lock().push(platform.live_streams());
        }
        self.finished.lock().push(recording.clone());
    }

    fn on_format_fallback(&self, requested: EncodingFormat, actual: EncodingFormat) {
        self.fallbacks.lock().push((requested, actual));
    }
}

/// Records every widget callback.
#[derive(Default)]
pub(crate) struct TestSink {
    live_frames: AtomicUsize,
    playback_ticks: Mutex<Vec<(Duration, Duration)>>,
    finishes: AtomicUsize,
    loaded: Mutex<Vec<PlaybackSource>>,
    seeks: Mutex<Vec<Duration>>,
}

impl TestSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live_frames(&self) -> usize {
        self.live_frames.load(Ordering::SeqCst)
    }

    pub fn playback_ticks(&self) -> usize {
        self.playback_ticks.lock().len()
    }

    pub fn finishes(&self) -> usize {
        self.finishes.load(Ordering::SeqCst)
    }

    pub fn loaded(&self) -> Vec<PlaybackSource> {
        self.loaded.lock().clone()
    }

    pub fn seeks(&self) -> Vec<Duration> {
        self.seeks.lock().clone()
    }
}

impl VisualizationSink for TestSink {
    fn on_live_frame(&self, _frame: &FrequencyFrame) {
        self.live_frames.fetch_add(1, Ordering::SeqCst);
    }

    fn on_playback_tick(&self, position: Duration, duration: Duration) {
        self.playback_ticks.lock().push((position, duration));
    }

    fn on_finish(&self) {
        self.finishes.fetch_add(1, Ordering::SeqCst);
    }

    fn load_source(&self, source: &PlaybackSource) {
        self.loaded.lock().push(source.clone());
    }

    fn seek_to(&self, position: Duration) {
        self.seeks.lock().push(position);
    }
}
