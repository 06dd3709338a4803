//! The stats engine: minute accounting, session tracking and persistence.
//!
//! The host control loop calls [`StatsEngine::tick`] as often as it likes.
//! The engine throttles itself with two deadlines on the millisecond clock:
//!
//! - the **minute deadline** advances by exactly one minute each time it
//!   fires, so counting stays phase-locked even when ticks arrive late;
//! - the **save deadline** is re-armed to `now + 1h` each time it fires. It
//!   only caps storage wear, so drift is fine and a late tick never causes
//!   a burst of catch-up writes.
//!
//! A printing session that ends is saved immediately, before the printing
//! flag drops, so session-final counts reach storage without waiting for
//! the hourly heartbeat.

use serde::{Deserialize, Serialize};

use crate::core::clock::{Clock, Deadline, MILLIS_PER_HOUR, MILLIS_PER_MINUTE};
use crate::core::counters::Counters;
use crate::core::machine::{JobSource, MotionOracle};
use crate::core::report::StatsReport;
use crate::core::session::{FeedTracking, SessionDetector, SessionTransition};
use crate::storage::{record, NvStorage, RecordLayout};

/// Static parameters of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Where the record lives in storage.
    pub layout: RecordLayout,
    /// Feed integration tuning.
    pub tracking: FeedTracking,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// A minute boundary was crossed and counted.
    pub minute_elapsed: bool,
    /// Session change detected on that boundary.
    pub transition: Option<SessionTransition>,
    /// Number of times the record was written.
    pub saves: u8,
}

impl TickOutcome {
    /// True when the tick did nothing.
    pub fn is_noop(&self) -> bool {
        !self.minute_elapsed && self.saves == 0
    }
}

/// Usage statistics engine.
///
/// Owns its collaborators: the clock `C`, the machine signals `M` and the
/// storage device `S`. Construction via [`StatsEngine::init`] loads the
/// persisted record, so a tick can never run before load.
#[derive(Debug)]
pub struct StatsEngine<C, M, S> {
    clock: C,
    machine: M,
    storage: S,
    settings: EngineSettings,
    counters: Counters,
    detector: SessionDetector,
    minute_deadline: Deadline,
    save_deadline: Deadline,
}

impl<C, M, S> StatsEngine<C, M, S>
where
    C: Clock,
    M: MotionOracle + JobSource,
    S: NvStorage,
{
    /// Arm both deadlines, anchor the detector and load persisted counters.
    ///
    /// Reads storage but never writes it.
    pub fn init(clock: C, machine: M, storage: S, settings: EngineSettings) -> Self {
        let now = clock.now_ms();
        let detector = SessionDetector::new(machine.current_feed_position());
        let counters = record::load(&storage, &settings.layout);

        tracing::info!(
            lifetime_minutes = counters.lifetime.minutes,
            trip_minutes = counters.trip.minutes,
            "lifetime stats initialized"
        );

        Self {
            clock,
            machine,
            storage,
            settings,
            counters,
            detector,
            minute_deadline: Deadline::after(now, MILLIS_PER_MINUTE),
            save_deadline: Deadline::after(now, MILLIS_PER_HOUR),
        }
    }

    /// Run whatever minute or hour work is due.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.now_ms();
        let mut outcome = TickOutcome::default();

        if self.minute_deadline.passed(now) {
            self.minute_deadline.advance(MILLIS_PER_MINUTE);
            outcome.minute_elapsed = true;
            outcome.transition = self.count_minute();
            if outcome.transition == Some(SessionTransition::Ended) {
                outcome.saves += 1;
            }
        }

        if self.save_deadline.passed(now) {
            self.save_deadline.rearm(now, MILLIS_PER_HOUR);
            tracing::debug!("hourly stats save");
            self.save();
            outcome.saves += 1;
        }

        outcome
    }

    /// Account one minute and re-evaluate the printing session.
    fn count_minute(&mut self) -> Option<SessionTransition> {
        self.counters.tick_minute();

        if self.detector.is_printing {
            self.counters.tick_print_minute();
            let units = self.detector.integrate(
                self.machine.current_feed_position(),
                self.machine.active_extrusion_scale(),
                &self.settings.tracking,
            );
            self.counters.add_centimeters(units);
        }

        let active = self.machine.pending_move_count() > 0 || self.machine.job_active();
        let transition = self.detector.transition(active);
        match transition {
            Some(SessionTransition::Started) => {
                self.detector.begin(self.machine.current_feed_position());
                tracing::info!("printing session started");
            }
            Some(SessionTransition::Ended) => {
                // Persist while the session is still marked active.
                self.save();
                self.detector.end();
                tracing::info!(
                    print_minutes = self.counters.trip.print_minutes,
                    print_centimeters = self.counters.trip.print_centimeters,
                    "printing session ended"
                );
            }
            None => {}
        }

        tracing::debug!(
            minutes = self.counters.lifetime.minutes,
            printing = self.detector.is_printing,
            "minute counted"
        );
        transition
    }

    /// Write the record now. Safe at any time; counters are not touched.
    pub fn save(&mut self) {
        tracing::debug!(
            printing = self.detector.is_printing,
            minutes = self.counters.lifetime.minutes,
            "saving lifetime stats"
        );
        record::save(&mut self.storage, &self.settings.layout, &self.counters);
    }

    /// Snapshot of the current counters for display.
    pub fn report(&self) -> StatsReport {
        StatsReport::new(&self.counters, self.detector.is_printing)
    }

    /// Zero the trip counters. Persistence waits for the next scheduled save.
    pub fn reset_trip(&mut self) {
        self.counters.reset_trip();
        tracing::info!("trip counters reset");
    }

    /// Current counters.
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Current session detector state.
    pub fn detector(&self) -> &SessionDetector {
        &self.detector
    }

    /// Whether a printing session is in progress.
    pub fn is_printing(&self) -> bool {
        self.detector.is_printing
    }

    /// Timestamp at which the next minute is counted.
    pub fn minute_deadline(&self) -> u32 {
        self.minute_deadline.at()
    }

    /// Timestamp of the next heartbeat save.
    pub fn save_deadline(&self) -> u32 {
        self.save_deadline.at()
    }

    /// Engine parameters.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Mutable machine signals, for scripted hosts.
    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// The storage device.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give the storage device back.
    pub fn into_storage(self) -> S {
        self.storage
    }
}
