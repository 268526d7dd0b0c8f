//! Wall-clock timing for one recording attempt.
//!
//! Elapsed time is always `now - start - paused_total`, never a tick count,
//! so late or dropped timer ticks cannot skew the displayed duration.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct TimingReference {
    started_at: Option<Instant>,
    paused_total: Duration,
    paused_at: Option<Instant>,
    stopped: Option<Duration>,
}

impl TimingReference {
    /// Begin a new attempt at zero.
    pub fn start(&mut self, now: Instant) {
        *self = Self {
            started_at: Some(now),
            ..Self::default()
        };
    }

    /// Freeze elapsed at its current value.
    pub fn pause(&mut self, now: Instant) {
        if self.started_at.is_some() && self.paused_at.is_none() && self.stopped.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Continue from the frozen value; the pause length is excluded.
    pub fn resume(&mut self, now: Instant) {
        if self.stopped.is_some() {
            return;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    /// Freeze elapsed for good, capped at `limit`, and return the final value.
    ///
    /// Later `pause`/`resume` calls leave it untouched until the next `start`.
    pub fn stop(&mut self, now: Instant, limit: Option<Duration>) -> Duration {
        let elapsed = self.elapsed(now);
        let elapsed = limit.map_or(elapsed, |max| elapsed.min(max));
        self.stopped = Some(elapsed);
        elapsed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        if let Some(stopped) = self.stopped {
            return stopped;
        }
        let Some(start) = self.started_at else {
            return Duration::ZERO;
        };
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(start)
            .saturating_sub(self.paused_total)
    }
}
