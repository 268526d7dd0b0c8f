use std::time::Duration;

use crate::models::audio_models::FrequencyFrame;
use crate::models::recording::PlaybackSource;

/// The external waveform widget.
///
/// Receives exactly one feed at a time: live frames while recording, or
/// playback ticks while a source is loaded. Same threading rules as
/// [`SessionDelegate`](super::capture_delegate::SessionDelegate).
pub trait VisualizationSink: Send + Sync {
    fn on_live_frame(&self, frame: &FrequencyFrame);

    fn on_playback_tick(&self, position: Duration, duration: Duration);

    /// Playback reached the end of the source.
    fn on_finish(&self);

    /// A new source is ready to draw (use `PlaybackSource::amplitude_envelope`).
    fn load_source(&self, _source: &PlaybackSource) {}

    fn play_from(&self, _position: Duration) {}

    fn pause_at(&self, _position: Duration) {}

    fn seek_to(&self, _position: Duration) {}
}
