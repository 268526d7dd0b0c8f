use std::time::Duration;

use crate::models::audio_models::EncodingFormat;
use crate::models::error::CaptureError;
use crate::models::recording::Recording;
use crate::models::state::SessionState;

/// Event delegate for the owning UI.
///
/// All methods are called from session worker threads (acquisition, timer,
/// feed) or from the thread that issued the call, never while the session
/// lock is held. Implementations must not call back into the session
/// synchronously; marshal to the UI thread instead.
pub trait SessionDelegate: Send + Sync {
    /// Called after every state transition.
    fn on_state_changed(&self, state: &SessionState);

    /// Called on every timer tick while recording.
    fn on_elapsed(&self, elapsed: Duration);

    /// Called when a failure moves the session into its error state.
    fn on_error(&self, error: &CaptureError);

    /// Called at most once per recording attempt, after capture resources
    /// have been released.
    fn on_recording_finished(&self, recording: &Recording);

    /// Informational: the encoder rejected `requested` and `actual` is used instead.
    fn on_format_fallback(&self, requested: EncodingFormat, actual: EncodingFormat) {
        log::info!("Encoder fell back from {} to {}", requested, actual);
    }
}
