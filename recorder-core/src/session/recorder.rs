use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::EncodingFormat;
use crate::models::config::SessionConfiguration;
use crate::models::error::{CaptureError, Operation};
use crate::models::recording::{PlaybackSource, Recording, SourceHandle};
use crate::models::state::SessionState;
use crate::session::feed::{FeedAdapter, FeedKind};
use crate::session::playback::PlaybackController;
use crate::session::resources::{CaptureResources, ChunkBuffer};
use crate::session::timing::TimingReference;
use crate::session::worker::{lock_while_running, Worker};
use crate::traits::analysis::AnalysisProvider;
use crate::traits::capture_delegate::SessionDelegate;
use crate::traits::capture_provider::{CaptureProvider, ChunkCallback};
use crate::traits::clock::{Clock, SystemClock};
use crate::traits::visualization::VisualizationSink;

/// Notifications gathered under the session lock and delivered after it is released.
enum Event {
    State(SessionState),
    Elapsed(Duration),
    Error(CaptureError),
    Finished(Recording),
    FormatFallback(EncodingFormat, EncodingFormat),
    LoadSource(PlaybackSource),
    PlayFrom(Duration),
    PauseAt(Duration),
    SeekTo(Duration),
    PlaybackFinished,
}

/// Who asked for a stop.
#[derive(Clone, Copy)]
enum StopOrigin<'a> {
    User,
    /// The timing coordinator hit `max_duration` during `attempt`.
    MaxDuration { attempt: u64, running: &'a AtomicBool },
}

/// Mutable session aggregate, guarded by `Shared::inner`.
struct Inner {
    state: SessionState,
    /// Bumped by `record`, `delete` and teardown. Async completions carrying
    /// an older value are stale and must release what they bring.
    attempt: u64,
    /// An encoder finalization is in flight outside the lock.
    finalizing: bool,
    timing: TimingReference,
    resources: Option<CaptureResources>,
    ticker: Option<Worker>,
    feed: FeedAdapter,
    recording: Option<Recording>,
    source: Option<PlaybackSource>,
    last_error: Option<CaptureError>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            attempt: 0,
            finalizing: false,
            timing: TimingReference::default(),
            resources: None,
            ticker: None,
            feed: FeedAdapter::default(),
            recording: None,
            source: None,
            last_error: None,
        }
    }

    fn invalid(&self, operation: Operation) -> CaptureError {
        CaptureError::InvalidState {
            operation,
            state: if self.finalizing { "finalizing" } else { self.state.name() },
        }
    }

    fn ensure_not_finalizing(&self, operation: Operation) -> Result<(), CaptureError> {
        if self.finalizing {
            return Err(self.invalid(operation));
        }
        Ok(())
    }

    fn holds_resources(&self) -> bool {
        self.resources.as_ref().is_some_and(CaptureResources::is_held)
    }

    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn release_resources(&mut self) {
        if let Some(mut resources) = self.resources.take() {
            resources.release();
        }
    }
}

struct Shared {
    config: SessionConfiguration,
    provider: Arc<dyn CaptureProvider>,
    analysis: Arc<dyn AnalysisProvider>,
    clock: Arc<dyn Clock>,
    delegate: Option<Arc<dyn SessionDelegate>>,
    sink: Option<Arc<dyn VisualizationSink>>,
    inner: Mutex<Inner>,
    /// Lock order: `inner` before `playback` before `chunks`.
    playback: Mutex<PlaybackController>,
    chunks: Arc<Mutex<ChunkBuffer>>,
}

/// Builder for [`RecorderSession`].
pub struct SessionBuilder {
    config: SessionConfiguration,
    provider: Arc<dyn CaptureProvider>,
    analysis: Arc<dyn AnalysisProvider>,
    clock: Arc<dyn Clock>,
    delegate: Option<Arc<dyn SessionDelegate>>,
    sink: Option<Arc<dyn VisualizationSink>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: SessionConfiguration) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn SessionDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn VisualizationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<RecorderSession, CaptureError> {
        self.config.validate().map_err(CaptureError::ConfigurationFailed)?;
        if !self.provider.is_available() {
            log::warn!("No capture device present; recording will fail until one appears");
        }
        Ok(RecorderSession {
            shared: Arc::new(Shared {
                config: self.config,
                provider: self.provider,
                analysis: self.analysis,
                clock: self.clock,
                delegate: self.delegate,
                sink: self.sink,
                inner: Mutex::new(Inner::new()),
                playback: Mutex::new(PlaybackController::default()),
                chunks: Arc::new(Mutex::new(ChunkBuffer::default())),
            }),
        })
    }
}

/// Handle on a pending acquisition started by [`RecorderSession::record`].
///
/// Dropping it detaches the acquisition thread; the session still applies
/// (or, after `delete`, releases) whatever the platform eventually returns.
pub struct AcquisitionHandle {
    handle: Option<thread::JoinHandle<()>>,
}

impl AcquisitionHandle {
    /// Block until the acquisition has settled and the session has applied it.
    pub fn wait(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("capture acquisition thread panicked");
            }
        }
    }
}

/// Audio recorder/player session.
///
/// The single authority over which user intents are legal. Owns the capture
/// resources for their whole acquisition lifetime, the timing coordinator,
/// the visualization feed and the playback cursor. Dropping the session
/// tears everything down regardless of state.
pub struct RecorderSession {
    shared: Arc<Shared>,
}

impl RecorderSession {
    pub fn builder(provider: Arc<dyn CaptureProvider>, analysis: Arc<dyn AnalysisProvider>) -> SessionBuilder {
        SessionBuilder {
            config: SessionConfiguration::default(),
            provider,
            analysis,
            clock: Arc::new(SystemClock),
            delegate: None,
            sink: None,
        }
    }

    pub fn config(&self) -> &SessionConfiguration {
        &self.shared.config
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state.clone()
    }

    /// Recording time while capturing; the playback cursor once a source is loaded.
    pub fn elapsed(&self) -> Duration {
        let inner = self.shared.inner.lock();
        let now = self.shared.clock.now();
        match inner.state {
            SessionState::Recording | SessionState::PausedRecording => inner.timing.elapsed(now),
            SessionState::Stopped | SessionState::Playing | SessionState::PausedPlayback => {
                self.shared.playback.lock().position(now)
            }
            _ => Duration::ZERO,
        }
    }

    /// Duration of the last completed recording.
    pub fn captured_duration(&self) -> Option<Duration> {
        self.shared.inner.lock().recording.as_ref().map(|r| r.duration)
    }

    pub fn recording(&self) -> Option<Recording> {
        self.shared.inner.lock().recording.clone()
    }

    /// The encoder's output for the last completed recording.
    pub fn encoded_output(&self) -> Option<Arc<[u8]>> {
        self.shared.inner.lock().recording.as_ref().map(|r| Arc::clone(&r.data))
    }

    pub fn source(&self) -> Option<PlaybackSource> {
        self.shared.inner.lock().source.clone()
    }

    pub fn source_handle(&self) -> Option<SourceHandle> {
        self.shared.inner.lock().source.as_ref().map(|s| s.handle.clone())
    }

    /// Last surfaced failure; cleared by the next user-initiated transition.
    pub fn error(&self) -> Option<CaptureError> {
        self.shared.inner.lock().last_error.clone()
    }

    pub fn holds_capture_resources(&self) -> bool {
        self.shared.inner.lock().holds_resources()
    }

    pub fn active_feed(&self) -> Option<FeedKind> {
        self.shared.inner.lock().feed.active()
    }

    /// Playback cursor and source length, when a source is loaded.
    pub fn playback_position(&self) -> Option<(Duration, Duration)> {
        let playback = self.shared.playback.lock();
        let duration = playback.duration()?;
        Some((playback.position(self.shared.clock.now()), duration))
    }

    /// `idle | stopped | playing | paused-playback | error → acquiring`.
    ///
    /// Acquisition continues on a background thread; the returned handle
    /// can be waited on.
    pub fn record(&self) -> Result<AcquisitionHandle, CaptureError> {
        self.shared.record()
    }

    /// `recording → paused-recording`, `playing → paused-playback`.
    pub fn pause(&self) -> Result<(), CaptureError> {
        self.shared.pause()
    }

    /// `paused-recording → recording`, `paused-playback → playing`.
    pub fn resume(&self) -> Result<(), CaptureError> {
        self.shared.resume()
    }

    /// `recording | paused-recording → stopped`, finalizing the encoder.
    ///
    /// Blocks while the encoder flushes. Also rewinds playback to `stopped`.
    pub fn stop(&self) -> Result<(), CaptureError> {
        self.shared.stop(StopOrigin::User)
    }

    /// `stopped → playing` from 0, `paused-playback → playing` from the frozen cursor.
    pub fn play(&self) -> Result<(), CaptureError> {
        self.shared.play()
    }

    /// Move the playback cursor. Only legal once a duration is known.
    pub fn seek(&self, position: Duration) -> Result<(), CaptureError> {
        self.shared.seek(position)
    }

    /// `* → idle`: release everything and discard the recording.
    pub fn delete(&self) {
        self.shared.delete(true);
    }

    /// Play back a buffer that this session did not record.
    pub fn load_source(&self, source: PlaybackSource) -> Result<(), CaptureError> {
        self.shared.load_source(source)
    }

    /// For widgets that detect the end of playback themselves.
    pub fn playback_finished(&self) {
        self.shared.playback_finished();
    }

    #[cfg(test)]
    fn snapshot(&self) -> (SessionState, bool) {
        let inner = self.shared.inner.lock();
        (inner.state.clone(), inner.holds_resources())
    }
}

impl Drop for RecorderSession {
    fn drop(&mut self) {
        self.shared.delete(false);
        log::debug!("Recorder session torn down");
    }
}

impl Shared {
    fn dispatch(&self, events: Vec<Event>) {
        for event in events {
            match event {
                Event::State(state) => {
                    if let Some(d) = &self.delegate {
                        d.on_state_changed(&state);
                    }
                }
                Event::Elapsed(elapsed) => {
                    if let Some(d) = &self.delegate {
                        d.on_elapsed(elapsed);
                    }
                }
                Event::Error(err) => {
                    if let Some(d) = &self.delegate {
                        d.on_error(&err);
                    }
                }
                Event::Finished(recording) => {
                    if let Some(d) = &self.delegate {
                        d.on_recording_finished(&recording);
                    }
                }
                Event::FormatFallback(requested, actual) => {
                    if let Some(d) = &self.delegate {
                        d.on_format_fallback(requested, actual);
                    }
                }
                Event::LoadSource(source) => {
                    if let Some(s) = &self.sink {
                        s.load_source(&source);
                    }
                }
                Event::PlayFrom(position) => {
                    if let Some(s) = &self.sink {
                        s.play_from(position);
                    }
                }
                Event::PauseAt(position) => {
                    if let Some(s) = &self.sink {
                        s.pause_at(position);
                    }
                }
                Event::SeekTo(position) => {
                    if let Some(s) = &self.sink {
                        s.seek_to(position);
                    }
                }
                Event::PlaybackFinished => {
                    if let Some(s) = &self.sink {
                        s.on_finish();
                    }
                }
            }
        }
    }

    fn set_state(&self, inner: &mut Inner, state: SessionState, events: &mut Vec<Event>) {
        debug_assert_eq!(
            inner.holds_resources(),
            state.holds_capture_resources() || inner.finalizing,
            "capture resources out of step with {}",
            state.name()
        );
        log::debug!("Session {} -> {}", inner.state.name(), state.name());
        inner.state = state.clone();
        events.push(Event::State(state));
    }

    /// Release everything tied to the current attempt and enter `error`.
    fn fail_capture(&self, inner: &mut Inner, err: CaptureError, events: &mut Vec<Event>) {
        log::error!("Recording attempt {} failed: {}", inner.attempt, err);
        inner.cancel_ticker();
        inner.feed.stop();
        inner.release_resources();
        self.chunks.lock().close();
        inner.timing.reset();
        inner.finalizing = false;
        inner.last_error = Some(err.clone());
        self.set_state(inner, SessionState::Error(err.clone()), events);
        events.push(Event::Error(err));
    }

    fn start_ticker(self: &Arc<Self>, inner: &mut Inner) -> Result<(), CaptureError> {
        let weak = Arc::downgrade(self);
        let worker = Worker::spawn("session-timer", self.config.tick_interval, move |running| {
            match weak.upgrade() {
                Some(shared) => {
                    shared.on_tick(running);
                    true
                }
                None => false,
            }
        })?;
        inner.ticker = Some(worker);
        Ok(())
    }

    fn start_live_feed(&self, inner: &mut Inner) {
        let Some(slot) = inner.resources.as_ref().map(CaptureResources::analyser_slot) else {
            return;
        };
        if let Err(e) = inner
            .feed
            .start_live(self.config.live_frame_interval, slot, self.sink.clone())
        {
            log::error!("Live feed unavailable: {}", e);
        }
    }

    fn start_playback_feed(self: &Arc<Self>, inner: &mut Inner) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let started = inner
            .feed
            .start_playback(self.config.playback_tick_interval, move |running| match weak.upgrade() {
                Some(shared) => {
                    shared.poll_playback(running);
                    true
                }
                None => false,
            });
        if let Err(e) = started {
            log::error!("Playback feed unavailable: {}", e);
        }
    }

    fn record(self: &Arc<Self>) -> Result<AcquisitionHandle, CaptureError> {
        let mut events = Vec::new();
        let attempt = {
            let mut inner = self.inner.lock();
            inner.ensure_not_finalizing(Operation::Record)?;
            if matches!(
                inner.state,
                SessionState::Acquiring | SessionState::Recording | SessionState::PausedRecording
            ) {
                return Err(inner.invalid(Operation::Record));
            }

            inner.last_error = None;
            inner.feed.stop();
            self.playback.lock().unload();
            inner.recording = None;
            inner.source = None;
            inner.timing.reset();
            inner.attempt += 1;
            self.chunks.lock().open(inner.attempt);
            self.set_state(&mut inner, SessionState::Acquiring, &mut events);
            inner.attempt
        };
        self.dispatch(events);
        log::info!("Requesting capture for attempt {}", attempt);

        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("capture-acquire".into())
            .spawn(move || {
                let result = shared.acquire(attempt);
                shared.complete_acquisition(attempt, result);
            });

        match spawned {
            Ok(handle) => Ok(AcquisitionHandle { handle: Some(handle) }),
            Err(e) => {
                let err = CaptureError::Unknown(format!("failed to spawn acquisition thread: {}", e));
                self.complete_acquisition(attempt, Err(err.clone()));
                Err(err)
            }
        }
    }

    fn acquire(&self, attempt: u64) -> Result<CaptureResources, CaptureError> {
        let chunks = Arc::clone(&self.chunks);
        let on_data: ChunkCallback = Arc::new(move |chunk: &[u8]| chunks.lock().accept(attempt, chunk));
        CaptureResources::acquire(
            self.provider.as_ref(),
            self.analysis.as_ref(),
            self.config.preferred_format,
            self.config.device_id.as_deref(),
            on_data,
        )
    }

    fn complete_acquisition(self: &Arc<Self>, attempt: u64, result: Result<CaptureResources, CaptureError>) {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.attempt != attempt || inner.state != SessionState::Acquiring {
                drop(inner);
                if let Ok(mut resources) = result {
                    log::warn!("Capture resources for cancelled attempt {} arrived late; releasing", attempt);
                    resources.release();
                }
                return;
            }

            match result {
                Ok(resources) => {
                    if let Some((requested, actual)) = resources.fallback() {
                        events.push(Event::FormatFallback(requested, actual));
                    }
                    inner.resources = Some(resources);
                    inner.timing.start(self.clock.now());
                    match self.start_ticker(&mut inner) {
                        Ok(()) => {
                            self.start_live_feed(&mut inner);
                            self.set_state(&mut inner, SessionState::Recording, &mut events);
                            log::info!("Recording attempt {}", attempt);
                        }
                        Err(err) => self.fail_capture(&mut inner, err, &mut events),
                    }
                }
                Err(err) => self.fail_capture(&mut inner, err, &mut events),
            }
        }
        self.dispatch(events);
    }

    fn on_tick(self: &Arc<Self>, running: &AtomicBool) {
        let mut events = Vec::new();
        let auto_stop = {
            let Some(inner) = lock_while_running(&self.inner, running) else {
                return;
            };
            if inner.state != SessionState::Recording || inner.finalizing {
                return;
            }
            let elapsed = inner.timing.elapsed(self.clock.now());
            events.push(Event::Elapsed(elapsed));
            self.config
                .max_duration
                .filter(|max| elapsed >= *max)
                .map(|_| inner.attempt)
        };
        self.dispatch(events);

        if let Some(attempt) = auto_stop {
            log::info!("Maximum duration reached; stopping attempt {}", attempt);
            if let Err(e) = self.stop(StopOrigin::MaxDuration { attempt, running }) {
                log::warn!("Automatic stop failed: {}", e);
            }
        }
    }

    fn pause(&self) -> Result<(), CaptureError> {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.ensure_not_finalizing(Operation::Pause)?;
            let now = self.clock.now();
            match inner.state {
                SessionState::Recording => {
                    inner.last_error = None;
                    inner.cancel_ticker();
                    inner.feed.stop();
                    inner.timing.pause(now);
                    if let Some(resources) = inner.resources.as_mut() {
                        resources.pause_encoder();
                    }
                    self.set_state(&mut inner, SessionState::PausedRecording, &mut events);
                }
                SessionState::Playing => {
                    let position = {
                        let mut playback = self.playback.lock();
                        playback.pause(now);
                        playback.position(now)
                    };
                    events.push(Event::PauseAt(position));
                    self.set_state(&mut inner, SessionState::PausedPlayback, &mut events);
                }
                _ => return Err(inner.invalid(Operation::Pause)),
            }
        }
        self.dispatch(events);
        Ok(())
    }

    fn resume(self: &Arc<Self>) -> Result<(), CaptureError> {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.ensure_not_finalizing(Operation::Resume)?;
            match inner.state {
                SessionState::PausedRecording => {
                    inner.last_error = None;
                    inner.timing.resume(self.clock.now());
                    if let Some(resources) = inner.resources.as_mut() {
                        resources.resume_encoder();
                    }
                    match self.start_ticker(&mut inner) {
                        Ok(()) => {
                            self.start_live_feed(&mut inner);
                            self.set_state(&mut inner, SessionState::Recording, &mut events);
                        }
                        Err(err) => self.fail_capture(&mut inner, err, &mut events),
                    }
                }
                SessionState::PausedPlayback => self.start_playing(&mut inner, &mut events),
                _ => return Err(inner.invalid(Operation::Resume)),
            }
        }
        self.dispatch(events);
        Ok(())
    }

    fn start_playing(&self, inner: &mut Inner, events: &mut Vec<Event>) {
        inner.last_error = None;
        let position = {
            let mut playback = self.playback.lock();
            let now = self.clock.now();
            playback.play(now);
            playback.position(now)
        };
        events.push(Event::PlayFrom(position));
        self.set_state(inner, SessionState::Playing, events);
    }

    fn play(&self) -> Result<(), CaptureError> {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.ensure_not_finalizing(Operation::Play)?;
            match inner.state {
                SessionState::Stopped => {
                    self.playback.lock().stop();
                    self.start_playing(&mut inner, &mut events);
                }
                SessionState::PausedPlayback => self.start_playing(&mut inner, &mut events),
                _ => return Err(inner.invalid(Operation::Play)),
            }
        }
        self.dispatch(events);
        Ok(())
    }

    fn seek(&self, position: Duration) -> Result<(), CaptureError> {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.ensure_not_finalizing(Operation::Seek)?;
            if !inner.state.is_playback() {
                return Err(inner.invalid(Operation::Seek));
            }
            let applied = self
                .playback
                .lock()
                .seek(position, self.clock.now())
                .ok_or_else(|| inner.invalid(Operation::Seek))?;
            events.push(Event::SeekTo(applied));
            if inner.state == SessionState::Stopped && !applied.is_zero() {
                self.set_state(&mut inner, SessionState::PausedPlayback, &mut events);
            }
        }
        self.dispatch(events);
        Ok(())
    }

    /// Stop capture (ordered: timer, encoder flush, stream release, state,
    /// completion callback) or rewind playback.
    fn stop(self: &Arc<Self>, origin: StopOrigin<'_>) -> Result<(), CaptureError> {
        let mut events = Vec::new();

        let (attempt, encoder, captured, info) = {
            let guard = match origin {
                StopOrigin::User => Some(self.inner.lock()),
                StopOrigin::MaxDuration { running, .. } => lock_while_running(&self.inner, running),
            };
            let Some(mut inner) = guard else {
                return Ok(());
            };
            if let StopOrigin::MaxDuration { attempt, .. } = origin {
                if inner.attempt != attempt {
                    return Ok(());
                }
            }
            if inner.finalizing {
                log::debug!("Stop already in flight for attempt {}", inner.attempt);
                return Ok(());
            }

            match inner.state {
                SessionState::Stopped => return Ok(()),
                SessionState::Playing | SessionState::PausedPlayback => {
                    self.playback.lock().stop();
                    inner.last_error = None;
                    events.push(Event::SeekTo(Duration::ZERO));
                    self.set_state(&mut inner, SessionState::Stopped, &mut events);
                    drop(inner);
                    self.dispatch(events);
                    return Ok(());
                }
                SessionState::Recording | SessionState::PausedRecording => {}
                _ => return Err(inner.invalid(Operation::Stop)),
            }

            inner.last_error = None;
            // 1. timer; an automatic stop never records past the cap
            inner.cancel_ticker();
            let limit = match origin {
                StopOrigin::User => None,
                StopOrigin::MaxDuration { .. } => self.config.max_duration,
            };
            let captured = inner.timing.stop(self.clock.now(), limit);
            inner.feed.stop();

            let taken = inner
                .resources
                .as_mut()
                .and_then(|r| r.take_encoder().map(|encoder| (encoder, r.info())));
            let Some((encoder, info)) = taken else {
                let err = CaptureError::EncoderFailure("no encoder session to finalize".into());
                self.fail_capture(&mut inner, err.clone(), &mut events);
                drop(inner);
                self.dispatch(events);
                return Err(err);
            };
            inner.finalizing = true;
            (inner.attempt, encoder, captured, info)
        };

        // 2. encoder flush, outside the lock so delete can still preempt
        let format = encoder.format();
        let finalized = encoder.finalize();

        let result = {
            let mut inner = self.inner.lock();
            if inner.attempt != attempt {
                log::info!("Finalization of attempt {} discarded after delete", attempt);
                return Err(CaptureError::Cancelled);
            }

            // 3. stream
            inner.release_resources();
            inner.finalizing = false;
            let mut data = self.chunks.lock().close();

            match finalized {
                Ok(tail) => {
                    data.extend_from_slice(&tail);
                    let recording = Recording::new(data, format, info, captured);
                    let source = PlaybackSource::from(&recording);
                    self.playback.lock().load(source.duration);
                    inner.timing.reset();
                    inner.recording = Some(recording.clone());
                    inner.source = Some(source.clone());

                    // 4. state
                    self.set_state(&mut inner, SessionState::Stopped, &mut events);
                    self.start_playback_feed(&mut inner);
                    events.push(Event::LoadSource(source));
                    // 5. completion
                    events.push(Event::Finished(recording));
                    log::info!(
                        "Recording attempt {} finished: {:.1}s, {} bytes",
                        attempt,
                        captured.as_secs_f64(),
                        inner.recording.as_ref().map_or(0, |r| r.data.len())
                    );
                    Ok(())
                }
                Err(err) => {
                    let err = if matches!(err, CaptureError::EncoderFailure(_)) {
                        err
                    } else {
                        CaptureError::EncoderFailure(err.to_string())
                    };
                    self.fail_capture(&mut inner, err.clone(), &mut events);
                    Err(err)
                }
            }
        };
        self.dispatch(events);
        result
    }

    fn load_source(self: &Arc<Self>, source: PlaybackSource) -> Result<(), CaptureError> {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.ensure_not_finalizing(Operation::LoadSource)?;
            if matches!(
                inner.state,
                SessionState::Acquiring | SessionState::Recording | SessionState::PausedRecording
            ) {
                return Err(inner.invalid(Operation::LoadSource));
            }

            inner.last_error = None;
            self.playback.lock().load(source.duration);
            inner.source = Some(source.clone());
            self.start_playback_feed(&mut inner);
            self.set_state(&mut inner, SessionState::Stopped, &mut events);
            events.push(Event::LoadSource(source));
        }
        self.dispatch(events);
        Ok(())
    }

    fn finish_playback(&self, inner: &mut Inner, events: &mut Vec<Event>) {
        self.playback.lock().stop();
        self.set_state(inner, SessionState::Stopped, events);
        events.push(Event::PlaybackFinished);
        log::debug!("Playback reached the end");
    }

    fn playback_finished(&self) {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Playing {
                self.finish_playback(&mut inner, &mut events);
            }
        }
        self.dispatch(events);
    }

    /// Playback feed body: push the cursor to the widget, detect the end.
    fn poll_playback(&self, running: &AtomicBool) {
        let ended = {
            let mut playback = self.playback.lock();
            let poll = playback.poll(self.clock.now());
            let Some(duration) = poll.duration else {
                return;
            };
            if let Some(sink) = &self.sink {
                sink.on_playback_tick(poll.position, duration);
            }
            poll.ended
        };
        if !ended {
            return;
        }

        let mut events = Vec::new();
        {
            let Some(mut inner) = lock_while_running(&self.inner, running) else {
                return;
            };
            if inner.state == SessionState::Playing {
                self.finish_playback(&mut inner, &mut events);
            }
        }
        self.dispatch(events);
    }

    /// `delete`, or teardown when `notify` is false.
    fn delete(&self, notify: bool) {
        let mut events = Vec::new();
        {
            let mut inner = self.inner.lock();
            inner.attempt += 1;
            inner.finalizing = false;
            inner.cancel_ticker();
            inner.feed.stop();
            self.playback.lock().unload();
            inner.release_resources();
            self.chunks.lock().close();
            inner.timing.reset();
            inner.recording = None;
            inner.source = None;
            inner.last_error = None;
            if inner.state != SessionState::Idle {
                self.set_state(&mut inner, SessionState::Idle, &mut events);
            }
        }
        if notify {
            self.dispatch(events);
        }
    }
}
