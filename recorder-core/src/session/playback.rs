//! Playback cursor over a loaded source.
//!
//! Like the timing coordinator, position is derived from a start instant and
//! the position at that instant, so poll jitter never moves the cursor.

use std::time::{Duration, Instant};

/// Result of one feed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPoll {
    pub position: Duration,
    pub duration: Option<Duration>,
    /// True exactly once, on the poll that first observes the end.
    pub ended: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackController {
    duration: Option<Duration>,
    /// Cursor while not playing.
    position: Duration,
    /// Set while playing.
    started_at: Option<Instant>,
    start_position: Duration,
}

impl PlaybackController {
    /// Load a source of `duration`; cursor at 0, not playing.
    pub fn load(&mut self, duration: Duration) {
        *self = Self {
            duration: Some(duration),
            ..Self::default()
        };
    }

    pub fn unload(&mut self) {
        *self = Self::default();
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn position(&self, now: Instant) -> Duration {
        let Some(started_at) = self.started_at else {
            return self.position;
        };
        let position = self.start_position + now.saturating_duration_since(started_at);
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// Start (or continue) from the current cursor. No-op without a source.
    pub fn play(&mut self, now: Instant) {
        if self.duration.is_none() || self.started_at.is_some() {
            return;
        }
        self.start_position = self.position;
        self.started_at = Some(now);
    }

    /// Freeze the cursor where it is.
    pub fn pause(&mut self, now: Instant) {
        if self.started_at.is_some() {
            self.position = self.position(now);
            self.started_at = None;
        }
    }

    /// Halt and rewind to 0.
    pub fn stop(&mut self) {
        self.started_at = None;
        self.position = Duration::ZERO;
        self.start_position = Duration::ZERO;
    }

    /// Move the cursor, clamped to the source length. Returns the applied
    /// position, or `None` when nothing is loaded.
    pub fn seek(&mut self, position: Duration, now: Instant) -> Option<Duration> {
        let duration = self.duration?;
        let target = position.min(duration);
        self.position = target;
        if self.started_at.is_some() {
            self.start_position = target;
            self.started_at = Some(now);
        }
        Some(target)
    }

    /// Sample the cursor; detects the natural end of playback.
    pub fn poll(&mut self, now: Instant) -> PlaybackPoll {
        let position = self.position(now);
        let ended = self.is_playing() && self.duration.is_some_and(|d| position >= d);
        if ended {
            self.position = position;
            self.started_at = None;
        }
        PlaybackPoll {
            position,
            duration: self.duration,
            ended,
        }
    }
}
