//! Halving wait toward a fire time.
//!
//! Each sleep covers half the remaining gap, bounded below by a minimum tick
//! and above by the gap itself, so the loop converges in a logarithmic number
//! of steps and never oversleeps the deadline.

use std::sync::Arc;
use std::time::Duration;

use racer_clock::{Clock, ClockOffset};

/// How long to sleep with `remaining_ms` left, or `None` once the deadline
/// has been reached.
pub fn next_wait(remaining_ms: i64, min_tick: Duration) -> Option<Duration> {
    if remaining_ms <= 0 {
        return None;
    }
    let remaining = Duration::from_millis(remaining_ms as u64);
    let half = Duration::from_millis((remaining_ms / 2) as u64);
    Some(half.max(min_tick).min(remaining))
}

/// A fire time expressed in reference (server) time.
#[derive(Clone)]
pub struct Deadline {
    target_ms: i64,
    offset: ClockOffset,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deadline")
            .field("target_ms", &self.target_ms)
            .field("offset", &self.offset)
            .finish()
    }
}

impl Deadline {
    pub fn new(target_ms: i64, offset: ClockOffset, clock: Arc<dyn Clock>) -> Self {
        Self {
            target_ms,
            offset,
            clock,
        }
    }

    pub fn target_ms(&self) -> i64 {
        self.target_ms
    }

    /// Current reference time.
    pub fn server_now_ms(&self) -> i64 {
        self.offset.apply(self.clock.now_millis())
    }

    pub fn remaining_ms(&self) -> i64 {
        self.target_ms.saturating_sub(self.server_now_ms())
    }

    pub fn next_wait(&self, min_tick: Duration) -> Option<Duration> {
        next_wait(self.remaining_ms(), min_tick)
    }
}
