//! Host time adapter.
//!
//! Provides the device tick counter for the simulator: microseconds since
//! construction, truncated to a wrapping `u32` like a hardware timer.

use std::time::Instant;

/// Monotonic microsecond clock with `u32` wraparound.
pub struct MonotonicClock {
    start: Instant,
    offset: u32,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Clock whose first reading is `offset`, for exercising wraparound.
    pub fn starting_at(offset: u32) -> Self {
        Self {
            start: Instant::now(),
            offset,
        }
    }

    /// Current tick (wraps about every 71 minutes).
    pub fn now(&self) -> u32 {
        (self.start.elapsed().as_micros() as u32).wrapping_add(self.offset)
    }
}
