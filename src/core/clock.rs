//! Monotonic millisecond clock and wrap-tolerant deadlines.
//!
//! The controller's tick counter is a `u32` that wraps roughly every 49.7
//! days. All scheduling compares timestamps through wrapping subtraction, so
//! a deadline armed just before the wrap still fires just after it.

use std::cell::Cell;
use std::time::Instant;

/// Milliseconds in one minute.
pub const MILLIS_PER_MINUTE: u32 = 60 * 1000;

/// Milliseconds in one hour.
pub const MILLIS_PER_HOUR: u32 = 60 * MILLIS_PER_MINUTE;

/// Source of the monotonic millisecond tick.
pub trait Clock {
    /// Current tick in milliseconds. Wraps at `u32::MAX`.
    fn now_ms(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Wall clock backed by [`Instant`], counting from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Hand-driven clock for tests and simulation.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: u32) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Jump to an absolute tick.
    pub fn set(&self, now: u32) {
        self.now.set(now);
    }

    /// Move forward by `millis`, wrapping like the hardware counter.
    pub fn advance(&self, millis: u32) {
        self.now.set(self.now.get().wrapping_add(millis));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

/// An absolute point on the wrapping millisecond timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(u32);

impl Deadline {
    /// Deadline `period` after `now`.
    pub fn after(now: u32, period: u32) -> Self {
        Self(now.wrapping_add(period))
    }

    /// The raw timestamp.
    pub fn at(&self) -> u32 {
        self.0
    }

    /// True once `now` is strictly later than the deadline.
    ///
    /// Valid as long as the two timestamps are less than half the counter
    /// range (~24.8 days) apart.
    pub fn passed(&self, now: u32) -> bool {
        (now.wrapping_sub(self.0) as i32) > 0
    }

    /// Push the deadline forward by exactly one period, keeping its phase.
    pub fn advance(&mut self, period: u32) {
        self.0 = self.0.wrapping_add(period);
    }

    /// Re-anchor the deadline to `now + period`.
    pub fn rearm(&mut self, now: u32, period: u32) {
        self.0 = now.wrapping_add(period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_not_passed_at_exact_time() {
        let deadline = Deadline::after(0, MILLIS_PER_MINUTE);
        assert!(!deadline.passed(MILLIS_PER_MINUTE - 1));
        assert!(!deadline.passed(MILLIS_PER_MINUTE));
        assert!(deadline.passed(MILLIS_PER_MINUTE + 1));
    }

    #[test]
    fn test_deadline_across_wraparound() {
        let start = u32::MAX - 10_000;
        let deadline = Deadline::after(start, MILLIS_PER_MINUTE);
        // The deadline itself wrapped past zero.
        assert!(deadline.at() < start);

        assert!(!deadline.passed(start));
        assert!(!deadline.passed(u32::MAX));
        assert!(deadline.passed(deadline.at().wrapping_add(1)));
    }

    #[test]
    fn test_advance_keeps_phase() {
        let mut deadline = Deadline::after(0, MILLIS_PER_MINUTE);
        deadline.advance(MILLIS_PER_MINUTE);
        assert_eq!(deadline.at(), 2 * MILLIS_PER_MINUTE);
    }

    #[test]
    fn test_rearm_anchors_to_now() {
        let mut deadline = Deadline::after(0, MILLIS_PER_HOUR);
        deadline.rearm(MILLIS_PER_HOUR + 5_000, MILLIS_PER_HOUR);
        assert_eq!(deadline.at(), 2 * MILLIS_PER_HOUR + 5_000);
    }

    #[test]
    fn test_manual_clock_wraps() {
        let clock = ManualClock::new(u32::MAX);
        clock.advance(2);
        assert_eq!(clock.now_ms(), 1);

        clock.set(500);
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn test_clock_by_reference() {
        let clock = ManualClock::new(42);
        let by_ref: &ManualClock = &clock;
        assert_eq!(Clock::now_ms(&by_ref), 42);
    }

    #[test]
    fn test_system_clock_starts_near_zero() {
        let clock = SystemClock::new();
        assert!(clock.now_ms() < 60_000);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: a deadline is passed exactly by timestamps in the
            // half-range after it, wherever it sits on the timeline
            #[test]
            fn prop_passed_is_wrap_invariant(start in any::<u32>(), delta in 1u32..(i32::MAX as u32)) {
                let deadline = Deadline::after(start, 0);
                prop_assert!(deadline.passed(start.wrapping_add(delta)));
                prop_assert!(!deadline.passed(start.wrapping_sub(delta - 1)));
            }

            // Property: advancing n periods lands on start + n * period
            #[test]
            fn prop_advance_is_additive(start in any::<u32>(), n in 0u32..1000) {
                let mut deadline = Deadline::after(start, MILLIS_PER_MINUTE);
                for _ in 0..n {
                    deadline.advance(MILLIS_PER_MINUTE);
                }
                let expected = start.wrapping_add(MILLIS_PER_MINUTE.wrapping_mul(n + 1));
                prop_assert_eq!(deadline.at(), expected);
            }
        }
    }
}
