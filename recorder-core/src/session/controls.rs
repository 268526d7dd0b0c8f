use std::time::Duration;

use crate::models::error::CaptureError;
use crate::models::recording::Recording;
use crate::models::state::SessionState;
use crate::session::recorder::{AcquisitionHandle, RecorderSession};

/// Single-button recorder: record, stop, delete and nothing else.
///
/// Playback, seeking and pausing stay reachable only through the full
/// [`RecorderSession`].
pub struct RecordButton {
    session: RecorderSession,
}

impl RecordButton {
    pub fn new(session: RecorderSession) -> Self {
        Self { session }
    }

    pub fn record(&self) -> Result<AcquisitionHandle, CaptureError> {
        self.session.record()
    }

    pub fn stop(&self) -> Result<(), CaptureError> {
        self.session.stop()
    }

    pub fn delete(&self) {
        self.session.delete();
    }

    /// Stop while capturing, otherwise start a new recording.
    ///
    /// Returns the pending acquisition when a recording was started.
    pub fn toggle(&self) -> Result<Option<AcquisitionHandle>, CaptureError> {
        if self.session.state().is_capturing() {
            self.session.stop()?;
            Ok(None)
        } else {
            self.session.record().map(Some)
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_recording(&self) -> bool {
        self.session.state().is_recording()
    }

    pub fn elapsed(&self) -> Duration {
        self.session.elapsed()
    }

    pub fn recording(&self) -> Option<Recording> {
        self.session.recording()
    }

    pub fn error(&self) -> Option<CaptureError> {
        self.session.error()
    }

    pub fn into_session(self) -> RecorderSession {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockPlatform, TestDelegate};
    use crate::traits::clock::ManualClock;
    use std::sync::Arc;

    fn button() -> (RecordButton, Arc<MockPlatform>, Arc<ManualClock>, Arc<TestDelegate>) {
        let platform = MockPlatform::new();
        let clock = Arc::new(ManualClock::new());
        let delegate = TestDelegate::new();
        let session = RecorderSession::builder(platform.clone(), platform.clone())
            .clock(clock.clone())
            .delegate(delegate.clone())
            .build()
            .unwrap();
        (RecordButton::new(session), platform, clock, delegate)
    }

    #[test]
    fn toggle_records_then_stops() {
        let (button, platform, clock, delegate) = button();

        button.toggle().unwrap().expect("acquisition started").wait();
        assert!(button.is_recording());

        clock.advance(Duration::from_secs(2));
        assert!(button.toggle().unwrap().is_none());

        assert_eq!(button.state(), SessionState::Stopped);
        assert_eq!(button.recording().unwrap().duration, Duration::from_secs(2));
        assert_eq!(delegate.finished_count(), 1);
        assert_eq!(platform.live_streams(), 0);
    }

    #[test]
    fn toggle_after_stop_starts_fresh_take() {
        let (button, _platform, _clock, _delegate) = button();
        button.toggle().unwrap().unwrap().wait();
        button.toggle().unwrap();

        button.toggle().unwrap().unwrap().wait();
        assert!(button.is_recording());
        assert!(button.recording().is_none());
    }

    #[test]
    fn delete_clears_take() {
        let (button, platform, _clock, _delegate) = button();
        button.record().unwrap().wait();
        button.stop().unwrap();

        button.delete();

        assert_eq!(button.state(), SessionState::Idle);
        assert!(button.recording().is_none());
        assert_eq!(button.elapsed(), Duration::ZERO);
        assert_eq!(platform.live_streams(), 0);
    }

    #[test]
    fn denied_permission_surfaces_error() {
        let (button, platform, _clock, delegate) = button();
        platform.fail_capture_with(CaptureError::PermissionDenied);

        button.toggle().unwrap().unwrap().wait();

        assert_eq!(button.error(), Some(CaptureError::PermissionDenied));
        assert!(button.state().is_error());
        assert!(!button.is_recording());
        assert_eq!(*delegate.errors.lock(), vec![CaptureError::PermissionDenied]);
    }

    #[test]
    fn into_session_keeps_the_take() {
        let (button, _platform, _clock, _delegate) = button();
        button.record().unwrap().wait();
        button.stop().unwrap();

        let session = button.into_session();
        session.play().unwrap();
        assert_eq!(session.state(), SessionState::Playing);
    }
}
