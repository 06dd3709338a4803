//! Live machine signals consumed by the stats engine.
//!
//! The planner and the job source are owned elsewhere; the engine only needs
//! to know whether moves are queued, whether a job is running, and where the
//! filament feed axis currently is.

use serde::{Deserialize, Serialize};

/// Read-only view of the motion planner.
pub trait MotionOracle {
    /// Number of moves waiting in the planner queue.
    fn pending_move_count(&self) -> usize;

    /// Cumulative filament feed position in millimeters.
    fn current_feed_position(&self) -> f32;

    /// Volumetric correction factor of the active extruder.
    fn active_extrusion_scale(&self) -> f32;
}

/// Read-only view of the job source (SD card, host stream).
pub trait JobSource {
    /// Whether a print job is currently running.
    fn job_active(&self) -> bool;
}

/// Plain snapshot of machine signals.
///
/// Implements both collaborator traits, so tests and the simulator can
/// script the machine by mutating fields between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Moves queued in the planner.
    pub pending_moves: usize,
    /// Feed axis position in millimeters.
    pub feed_position: f32,
    /// Volumetric multiplier of the active extruder.
    pub extrusion_scale: f32,
    /// Whether a job source reports an active job.
    pub job_active: bool,
}

impl Default for MachineSnapshot {
    fn default() -> Self {
        Self {
            pending_moves: 0,
            feed_position: 0.0,
            extrusion_scale: 1.0,
            job_active: false,
        }
    }
}

impl MachineSnapshot {
    /// An idle machine at the given feed position.
    pub fn at(feed_position: f32) -> Self {
        Self {
            feed_position,
            ..Self::default()
        }
    }

    /// Feed `mm` of filament with one move queued.
    pub fn extrude(&mut self, mm: f32) {
        self.feed_position += mm;
        self.pending_moves = self.pending_moves.max(1);
    }

    /// Drain the planner and stop any job.
    pub fn idle(&mut self) {
        self.pending_moves = 0;
        self.job_active = false;
    }
}

impl MotionOracle for MachineSnapshot {
    fn pending_move_count(&self) -> usize {
        self.pending_moves
    }

    fn current_feed_position(&self) -> f32 {
        self.feed_position
    }

    fn active_extrusion_scale(&self) -> f32 {
        self.extrusion_scale
    }
}

impl JobSource for MachineSnapshot {
    fn job_active(&self) -> bool {
        self.job_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let machine = MachineSnapshot::default();
        assert_eq!(machine.pending_move_count(), 0);
        assert!(!machine.job_active());
        assert!((machine.active_extrusion_scale() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_extrude_queues_a_move() {
        let mut machine = MachineSnapshot::at(100.0);
        machine.extrude(25.0);
        assert_eq!(machine.pending_move_count(), 1);
        assert!((machine.current_feed_position() - 125.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_idle_clears_signals() {
        let mut machine = MachineSnapshot::at(0.0);
        machine.extrude(5.0);
        machine.job_active = true;

        machine.idle();

        assert_eq!(machine.pending_move_count(), 0);
        assert!(!machine.job_active());
        // Position is history, not a signal.
        assert!((machine.current_feed_position() - 5.0).abs() < f32::EPSILON);
    }
}
