use std::time::Duration;

use super::audio_models::EncodingFormat;

/// Upper bound on the tick interval; the elapsed display has one decimal.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for a recorder session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfiguration {
    /// Format requested from the encoder. Falls back to the provider's
    /// default format when the encoder rejects it.
    pub preferred_format: EncodingFormat,

    /// Hard recording cap (None = unlimited).
    pub max_duration: Option<Duration>,

    /// Timing coordinator tick period (default: 100 ms).
    pub tick_interval: Duration,

    /// Live frequency feed polling period (default: ~60 fps).
    pub live_frame_interval: Duration,

    /// Playback position feed polling period (default: 50 ms).
    pub playback_tick_interval: Duration,

    /// Specific capture device ID, or None for system default.
    pub device_id: Option<String>,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval.is_zero() {
            return Err("tick interval must be positive".into());
        }
        if self.tick_interval > MAX_TICK_INTERVAL {
            return Err(format!(
                "tick interval {:?} exceeds {:?}",
                self.tick_interval, MAX_TICK_INTERVAL
            ));
        }
        if self.live_frame_interval.is_zero() || self.playback_tick_interval.is_zero() {
            return Err("feed intervals must be positive".into());
        }
        if self.max_duration.is_some_and(|max| max.is_zero()) {
            return Err("max duration must be positive".into());
        }
        Ok(())
    }

    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_duration = Some(max);
        self
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            preferred_format: EncodingFormat::Pcm16,
            max_duration: None,
            tick_interval: MAX_TICK_INTERVAL,
            live_frame_interval: Duration::from_millis(16),
            playback_tick_interval: Duration::from_millis(50),
            device_id: None,
        }
    }
}
