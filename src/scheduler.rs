//! Deadlines on the free-running tick counter.
//!
//! The device clock is a `u32` that wraps roughly every 71 minutes, so
//! deadlines are never ordered with `<`.  Every comparison goes through the
//! signed difference `(t - now) as i32`, which stays correct across a wrap
//! as long as deadlines lie within half the counter range of `now`.
//!
//! ```text
//!        now                       t = now + delay
//!  ──────┼─────────────────────────┼──────────▶ (mod 2^32)
//!        └──── in_future(t) ───────┘
//! ```

/// Signed distance from `now` to `t`.  Positive means `t` is still ahead.
#[inline]
pub const fn ticks_until(t: u32, now: u32) -> i32 {
    t.wrapping_sub(now) as i32
}

/// `true` if `t` has not been reached yet.
#[inline]
pub const fn in_future(t: u32, now: u32) -> bool {
    ticks_until(t, now) > 0
}

/// A single restart/sampling deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: u32,
}

impl Deadline {
    pub const fn at(at: u32) -> Self {
        Self { at }
    }

    /// Deadline `delay` ticks after `now`.
    pub const fn after(now: u32, delay: u32) -> Self {
        Self {
            at: now.wrapping_add(delay),
        }
    }

    /// Re-arm to `now + delay`.
    pub fn schedule(&mut self, now: u32, delay: u32) {
        self.at = now.wrapping_add(delay);
    }

    pub fn tick(&self) -> u32 {
        self.at
    }

    /// `true` once `now` has reached the deadline.
    pub fn is_due(&self, now: u32) -> bool {
        !in_future(self.at, now)
    }

    /// Periodic sampling.
    ///
    /// Returns `true` when the deadline has been reached and advances it by
    /// one `period`.  If the caller fell so far behind that the advanced
    /// deadline is still in the past, the missed samples are dropped and the
    /// next one is placed a full period after `now`.
    pub fn should_sample(&mut self, now: u32, period: u32) -> bool {
        if in_future(self.at, now) {
            return false;
        }
        self.at = self.at.wrapping_add(period);
        if !in_future(self.at, now) {
            self.at = now.wrapping_add(period);
        }
        true
    }
}
