use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::models::error::CaptureError;
use crate::session::resources::AnalyserSlot;
use crate::session::worker::Worker;
use crate::traits::visualization::VisualizationSink;

/// Which data the waveform widget is currently being fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// Frequency-magnitude snapshots from the analyser; recording only.
    Live,
    /// Cursor position over the loaded source; stopped/playing/paused-playback.
    Playback,
}

/// Owns the single active visualization polling loop.
///
/// Starting a feed first cancels (and joins) the previous one, so the two
/// loops never run at the same time.
#[derive(Default)]
pub(crate) struct FeedAdapter {
    active: Option<(FeedKind, Worker)>,
}

impl FeedAdapter {
    pub fn active(&self) -> Option<FeedKind> {
        self.active.as_ref().map(|(kind, _)| *kind)
    }

    pub fn stop(&mut self) {
        if let Some((kind, worker)) = self.active.take() {
            worker.cancel();
            log::debug!("Stopped {:?} feed", kind);
        }
    }

    /// Poll the analyser every `interval` and push frames to `sink`.
    ///
    /// The loop ends by itself once the analyser slot is emptied by release.
    pub fn start_live(
        &mut self,
        interval: Duration,
        slot: AnalyserSlot,
        sink: Option<Arc<dyn VisualizationSink>>,
    ) -> Result<(), CaptureError> {
        self.stop();
        let worker = Worker::spawn("live-feed", interval, move |running: &AtomicBool| {
            let mut guard = slot.lock();
            let Some(analyser) = guard.as_mut() else {
                return false;
            };
            if let Some(sink) = &sink {
                let frame = analyser.magnitude_snapshot();
                if running.load(Ordering::SeqCst) {
                    sink.on_live_frame(&frame);
                }
            }
            true
        })?;
        self.active = Some((FeedKind::Live, worker));
        Ok(())
    }

    /// Run `poll` every `interval` for the playback feed.
    pub fn start_playback<F>(&mut self, interval: Duration, poll: F) -> Result<(), CaptureError>
    where
        F: FnMut(&AtomicBool) -> bool + Send + 'static,
    {
        self.stop();
        let worker = Worker::spawn("playback-feed", interval, poll)?;
        self.active = Some((FeedKind::Playback, worker));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{wait_until, MockAnalyser, TestSink};
    use crate::traits::analysis::Analyser;
    use parking_lot::Mutex;

    const FAST: Duration = Duration::from_millis(1);

    fn live_slot() -> AnalyserSlot {
        let analyser: Box<dyn Analyser> = Box::new(MockAnalyser::standalone());
        Arc::new(Mutex::new(Some(analyser)))
    }

    #[test]
    fn live_feed_pushes_frames() {
        let sink = TestSink::new();
        let mut feed = FeedAdapter::default();
        feed.start_live(FAST, live_slot(), Some(sink.clone())).unwrap();

        assert_eq!(feed.active(), Some(FeedKind::Live));
        assert!(wait_until(|| sink.live_frames() >= 3));
        feed.stop();
        assert_eq!(feed.active(), None);
    }

    #[test]
    fn switching_feeds_stops_the_previous_loop() {
        let sink = TestSink::new();
        let mut feed = FeedAdapter::default();
        feed.start_live(FAST, live_slot(), Some(sink.clone())).unwrap();
        assert!(wait_until(|| sink.live_frames() >= 1));

        feed.start_playback(FAST, |_| true).unwrap();
        let frames = sink.live_frames();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(feed.active(), Some(FeedKind::Playback));
        assert_eq!(sink.live_frames(), frames);
    }

    #[test]
    fn live_feed_ends_when_analyser_released() {
        let sink = TestSink::new();
        let slot = live_slot();
        let mut feed = FeedAdapter::default();
        feed.start_live(FAST, Arc::clone(&slot), Some(sink.clone())).unwrap();
        assert!(wait_until(|| sink.live_frames() >= 1));

        slot.lock().take();
        let frames = sink.live_frames();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(sink.live_frames(), frames);
    }
}
