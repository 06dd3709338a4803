//! Reset-trip command for lifestats.
//!
//! Zeroes the trip counters and writes the record back immediately.

use serde::Serialize;

use crate::config::Config;
use crate::core::{MachineSnapshot, StatsEngine, StatsReport, SystemClock};
use crate::storage::{write_record, NvStorage};

/// Options for the reset-trip command.
#[derive(Debug, Clone, Default)]
pub struct ResetTripOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the reset-trip command.
#[derive(Debug, Clone, Serialize)]
pub struct ResetTripOutput {
    /// Whether the reset was persisted.
    pub success: bool,
    /// Counters before the reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<StatsReport>,
    /// Counters after the reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<StatsReport>,
    /// Error message if the reset failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResetTripOutput {
    /// Create a successful output.
    pub fn success(before: StatsReport, after: StatsReport) -> Self {
        Self {
            success: true,
            before: Some(before),
            after: Some(after),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            before: None,
            after: None,
            error: Some(error.into()),
        }
    }
}

/// The reset-trip command implementation.
pub struct ResetTripCommand<S: NvStorage> {
    storage: S,
    config: Config,
}

impl<S: NvStorage> ResetTripCommand<S> {
    /// Create a new reset-trip command.
    pub fn new(storage: S, config: Config) -> Self {
        Self { storage, config }
    }

    /// Run the reset-trip command.
    ///
    /// Unlike the engine's own reset, the record is written right away and
    /// a failed write is reported instead of swallowed.
    pub fn run(&mut self) -> ResetTripOutput {
        if let Err(err) = self.config.validate() {
            return ResetTripOutput::failure(err.to_string());
        }

        let settings = self.config.engine_settings();
        let mut engine = StatsEngine::init(
            SystemClock::new(),
            MachineSnapshot::default(),
            &mut self.storage,
            settings,
        );
        let before = engine.report();
        engine.reset_trip();
        let after = engine.report();
        let counters = *engine.counters();
        drop(engine);

        match write_record(&mut self.storage, &settings.layout, &counters) {
            Ok(()) => ResetTripOutput::success(before, after),
            Err(err) => ResetTripOutput::failure(err.to_string()),
        }
    }

    /// Consume the command and return the storage device.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ResetTripOutput, options: &ResetTripOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &ResetTripOutput) -> String {
        match (&output.before, &output.after, output.success) {
            (Some(before), Some(after), true) => format!(
                "Trip counters reset (was {} min, {} print min, {} cm)\n{}\n",
                before.trip.minutes, before.trip.print_minutes, before.trip.print_centimeters, after
            ),
            _ => format!(
                "Reset failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
