//! Core stats tracking for lifestats.
//!
//! This module contains the counters, the printing-session detector, the
//! collaborator traits the engine reads from, and the engine itself.

pub mod clock;
pub mod counters;
pub mod engine;
pub mod machine;
pub mod report;
pub mod session;

pub use clock::{
    Clock, Deadline, ManualClock, SystemClock, MILLIS_PER_HOUR, MILLIS_PER_MINUTE,
};
pub use counters::{Counters, Totals};
pub use engine::{EngineSettings, StatsEngine, TickOutcome};
pub use machine::{JobSource, MachineSnapshot, MotionOracle};
pub use report::StatsReport;
pub use session::{FeedTracking, SessionDetector, SessionTransition};
