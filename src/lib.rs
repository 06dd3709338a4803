//! lifestats - printer usage counters on an emulated EEPROM
//!
//! Tracks powered minutes, printing minutes and extruded length over the
//! machine's lifetime and since the last trip reset, and persists them in a
//! small magic-tagged record inside non-volatile storage.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;

pub use config::Config;
pub use core::{
    Clock, Counters, EngineSettings, FeedTracking, JobSource, MachineSnapshot, ManualClock,
    MotionOracle, SessionDetector, SessionTransition, StatsEngine, StatsReport, SystemClock,
    TickOutcome, Totals,
};
pub use error::{FailOpen, Result, StatsError};
pub use storage::{FileStorage, MemoryStorage, NvStorage, RecordLayout};

// CLI commands
pub use cli::{ResetTripCommand, ShowCommand, SimulateCommand};
