//! Printing-session detection and filament length integration.
//!
//! A session is "printing" while the planner has queued moves or a job is
//! active. While printing, each minute the feed-axis delta is scaled by the
//! extrusion multiplier and folded into a fractional accumulator; whole
//! length units are carried out of it so long sessions lose no precision.

use serde::{Deserialize, Serialize};

/// Largest feed delta (mm) accepted per minute sample.
///
/// Anything at or above this is treated as a position reset or a bogus jump.
pub const DEFAULT_MAX_FEED_DELTA: f32 = 60.0 * 30.0;

/// Feed millimeters per reported length unit (one centimeter).
pub const DEFAULT_UNIT_LENGTH: f32 = 10.0;

/// Tuning for feed integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedTracking {
    /// Exclusive upper bound on accepted per-sample feed deltas (mm).
    pub max_feed_delta: f32,
    /// Feed millimeters that make up one reported unit.
    pub unit_length: f32,
}

impl Default for FeedTracking {
    fn default() -> Self {
        Self {
            max_feed_delta: DEFAULT_MAX_FEED_DELTA,
            unit_length: DEFAULT_UNIT_LENGTH,
        }
    }
}

impl FeedTracking {
    /// Both values must be finite and positive.
    pub fn is_valid(&self) -> bool {
        self.max_feed_delta.is_finite()
            && self.max_feed_delta > 0.0
            && self.unit_length.is_finite()
            && self.unit_length > 0.0
    }
}

/// A change in the printing state observed on a minute boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTransition {
    /// Idle to printing.
    Started,
    /// Printing to idle.
    Ended,
}

/// Session state carried between minute samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionDetector {
    /// Whether the last evaluation classified the machine as printing.
    pub is_printing: bool,
    /// Feed position at the previous sample (mm).
    pub last_feed_position: f32,
    /// Scaled feed not yet carried into whole units, in `[0, unit_length)`.
    pub accumulated_length: f32,
}

impl SessionDetector {
    /// Idle detector anchored at `feed_position`.
    pub fn new(feed_position: f32) -> Self {
        Self {
            is_printing: false,
            last_feed_position: feed_position,
            accumulated_length: 0.0,
        }
    }

    /// Fold the feed delta since the last sample into the accumulator.
    ///
    /// Returns the number of whole units carried out. Deltas outside
    /// `(0, max_feed_delta)` are dropped, and so is a scaled length that is
    /// not a positive finite number. The reference position always moves
    /// to `position` so a single bad sample cannot poison later ones.
    pub fn integrate(&mut self, position: f32, scale: f32, tracking: &FeedTracking) -> u32 {
        let diff = position - self.last_feed_position;
        self.last_feed_position = position;

        if !(diff > 0.0 && diff < tracking.max_feed_delta && tracking.unit_length > 0.0) {
            return 0;
        }

        let total = self.accumulated_length + diff * scale;
        if !(total.is_finite() && total > self.accumulated_length) {
            return 0;
        }

        // Carry in one step; the remainder of `%` is exact.
        let remainder = total % tracking.unit_length;
        let whole = ((total - remainder) / tracking.unit_length).round();
        self.accumulated_length = remainder;
        whole as u32
    }

    /// Enter a printing session.
    ///
    /// Drift accumulated while idle must not count as printed length, so
    /// the reference is re-anchored and the remainder discarded.
    pub fn begin(&mut self, position: f32) {
        self.is_printing = true;
        self.last_feed_position = position;
        self.accumulated_length = 0.0;
    }

    /// Leave the printing session.
    pub fn end(&mut self) {
        self.is_printing = false;
    }

    /// Compare the new activity signal with the current state.
    pub fn transition(&self, active: bool) -> Option<SessionTransition> {
        match (self.is_printing, active) {
            (false, true) => Some(SessionTransition::Started),
            (true, false) => Some(SessionTransition::Ended),
            _ => None,
        }
    }
}
