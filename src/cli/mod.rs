//! CLI commands for lifestats.
//!
//! - **show**: print the persisted counters
//! - **reset-trip**: zero the trip counters and persist
//! - **simulate**: drive the engine with a scripted machine

pub mod reset;
pub mod show;
pub mod simulate;

pub use reset::{ResetTripCommand, ResetTripOptions, ResetTripOutput};
pub use show::{ShowCommand, ShowOptions, ShowOutput};
pub use simulate::{SimulateCommand, SimulateOptions, SimulateOutput};
