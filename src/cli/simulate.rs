//! Simulate command for lifestats.
//!
//! Drives the engine with a scripted clock and machine: some idle minutes,
//! then a printing session, then one idle minute so the session closes and
//! is saved. Counting starts from whatever the storage already holds.

use serde::Serialize;

use crate::config::Config;
use crate::core::{
    MachineSnapshot, ManualClock, SessionTransition, StatsEngine, StatsReport, TickOutcome,
};
use crate::storage::NvStorage;

/// Default feed per printing minute, in millimeters.
pub const DEFAULT_FEED_RATE: f32 = 600.0;

/// Options for the simulate command.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// Printing minutes to simulate.
    pub minutes: u32,
    /// Idle minutes before the print starts.
    pub idle_minutes: u32,
    /// Filament fed per printing minute (mm).
    pub feed_rate: f32,
    /// Extrusion multiplier applied to the fed length.
    pub scale: f32,
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            minutes: 0,
            idle_minutes: 0,
            feed_rate: DEFAULT_FEED_RATE,
            scale: 1.0,
            json: false,
            quiet: false,
        }
    }
}

/// Output format for the simulate command.
#[derive(Debug, Clone, Serialize)]
pub struct SimulateOutput {
    /// Whether the simulation ran.
    pub success: bool,
    /// Minute boundaries crossed.
    pub minutes_elapsed: u32,
    /// Printing sessions started.
    pub sessions_started: u32,
    /// Printing sessions ended.
    pub sessions_ended: u32,
    /// Record writes issued by the engine.
    pub saves: u32,
    /// Counters after the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<StatsReport>,
    /// Non-fatal notice about the inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Error message if the simulation could not run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SimulateOutput {
    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            minutes_elapsed: 0,
            sessions_started: 0,
            sessions_ended: 0,
            saves: 0,
            report: None,
            warning: None,
            error: Some(error.into()),
        }
    }

    fn tally(&mut self, outcome: TickOutcome) {
        if outcome.minute_elapsed {
            self.minutes_elapsed += 1;
        }
        match outcome.transition {
            Some(SessionTransition::Started) => self.sessions_started += 1,
            Some(SessionTransition::Ended) => self.sessions_ended += 1,
            None => {}
        }
        self.saves += u32::from(outcome.saves);
    }
}

/// The simulate command implementation.
pub struct SimulateCommand<S: NvStorage> {
    storage: S,
    config: Config,
}

impl<S: NvStorage> SimulateCommand<S> {
    /// Create a new simulate command.
    pub fn new(storage: S, config: Config) -> Self {
        Self { storage, config }
    }

    /// Run the simulate command.
    pub fn run(&mut self, options: &SimulateOptions) -> SimulateOutput {
        if let Err(err) = self.config.validate() {
            return SimulateOutput::failure(err.to_string());
        }
        if !(options.feed_rate.is_finite() && options.feed_rate >= 0.0) {
            return SimulateOutput::failure(format!(
                "feed rate must be a non-negative number, got {}",
                options.feed_rate
            ));
        }
        if !(options.scale.is_finite() && options.scale >= 0.0) {
            return SimulateOutput::failure(format!(
                "extrusion scale must be a non-negative number, got {}",
                options.scale
            ));
        }

        let settings = self.config.engine_settings();
        let clock = ManualClock::new(0);
        let machine = MachineSnapshot {
            extrusion_scale: options.scale,
            ..MachineSnapshot::default()
        };
        let mut engine = StatsEngine::init(&clock, machine, &mut self.storage, settings);

        let mut output = SimulateOutput {
            success: true,
            minutes_elapsed: 0,
            sessions_started: 0,
            sessions_ended: 0,
            saves: 0,
            report: None,
            warning: None,
            error: None,
        };

        if options.feed_rate >= settings.tracking.max_feed_delta {
            output.warning = Some(format!(
                "feed rate {} mm/min is not below the {} mm plausibility bound; \
                 no length will be counted",
                options.feed_rate, settings.tracking.max_feed_delta
            ));
        }

        for _ in 0..options.idle_minutes {
            output.tally(next_minute(&mut engine, &clock));
        }

        if options.minutes > 0 {
            for _ in 0..options.minutes {
                let machine = engine.machine_mut();
                machine.job_active = true;
                machine.extrude(options.feed_rate);
                output.tally(next_minute(&mut engine, &clock));
            }

            engine.machine_mut().idle();
            output.tally(next_minute(&mut engine, &clock));
        }

        tracing::info!(
            minutes = output.minutes_elapsed,
            saves = output.saves,
            "simulation finished"
        );

        output.report = Some(engine.report());
        output
    }

    /// Consume the command and return the storage device.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SimulateOutput, options: &SimulateOptions) -> String {
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
    fn format_human_readable(&self, output: &SimulateOutput) -> String {
        let report = match (&output.report, output.success) {
            (Some(report), true) => report,
            _ => {
                return format!(
                    "Simulation failed: {}\n",
                    output.error.as_deref().unwrap_or("unknown error")
                )
            }
        };

        let mut text = String::new();
        if let Some(warning) = &output.warning {
            text.push_str(&format!("Warning: {}\n", warning));
        }
        text.push_str(&format!(
            "Simulated {} minutes ({} session(s) started, {} ended), {} save(s)\n",
            output.minutes_elapsed, output.sessions_started, output.sessions_ended, output.saves
        ));
        text.push_str(&format!("{}\n", report));
        text
    }
}

/// Move the clock just past the next minute boundary and tick once.
fn next_minute<S: NvStorage>(
    engine: &mut StatsEngine<&ManualClock, MachineSnapshot, S>,
    clock: &ManualClock,
) -> TickOutcome {
    clock.set(engine.minute_deadline().wrapping_add(1));
    engine.tick()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Counters;
    use crate::storage::{read_record, write_record, FileStorage, MemoryStorage};
    use tempfile::TempDir;

    fn options(minutes: u32) -> SimulateOptions {
        SimulateOptions {
            minutes,
            ..Default::default()
        }
    }

    #[test]
    fn test_short_print() {
        let mut cmd = SimulateCommand::new(MemoryStorage::new(), Config::default());

        let output = cmd.run(&options(10));

        assert!(output.success);
        assert_eq!(output.minutes_elapsed, 11);
        assert_eq!(output.sessions_started, 1);
        assert_eq!(output.sessions_ended, 1);
        assert_eq!(output.saves, 1);

        // The session is noticed at the first boundary, so the first
        // minute's feed is not counted.
        let report = output.report.unwrap();
        assert_eq!(report.lifetime.minutes, 11);
        assert_eq!(report.lifetime.print_minutes, 10);
        assert_eq!(report.lifetime.print_centimeters, 540);
        assert!(!report.printing);
    }

    #[test]
    fn test_session_end_is_persisted() {
        let mut cmd = SimulateCommand::new(MemoryStorage::new(), Config::default());
        cmd.run(&options(10));

        let storage = cmd.into_storage();
        let saved = read_record(&storage, &Config::default().layout())
            .unwrap()
            .unwrap();
        assert_eq!(saved.lifetime.print_minutes, 10);
        assert_eq!(saved.trip.print_centimeters, 540);
    }

    #[test]
    fn test_hour_long_print_saves_twice() {
        let mut cmd = SimulateCommand::new(MemoryStorage::new(), Config::default());

        let output = cmd.run(&options(60));

        assert_eq!(output.minutes_elapsed, 61);
        assert_eq!(output.saves, 2);
        let report = output.report.unwrap();
        assert_eq!(report.lifetime.print_minutes, 60);
        assert_eq!(report.lifetime.print_centimeters, 59 * 60);
    }

    #[test]
    fn test_idle_only() {
        let mut cmd = SimulateCommand::new(MemoryStorage::new(), Config::default());

        let output = cmd.run(&SimulateOptions {
            idle_minutes: 5,
            ..Default::default()
        });

        assert_eq!(output.minutes_elapsed, 5);
        assert_eq!(output.sessions_started, 0);
        assert_eq!(output.saves, 0);
        let report = output.report.unwrap();
        assert_eq!(report.lifetime.minutes, 5);
        assert_eq!(report.lifetime.print_minutes, 0);
    }

    #[test]
    fn test_scale_applies_to_length() {
        let mut cmd = SimulateCommand::new(MemoryStorage::new(), Config::default());

        let output = cmd.run(&SimulateOptions {
            minutes: 3,
            feed_rate: 100.0,
            scale: 0.5,
            ..Default::default()
        });

        assert_eq!(output.report.unwrap().lifetime.print_centimeters, 10);
    }

    #[test]
    fn test_continues_from_stored_counters() {
        let mut storage = MemoryStorage::new();
        let start = Counters::from_words([100, 50, 2000, 10, 5, 200]);
        write_record(&mut storage, &Config::default().layout(), &start).unwrap();
        let mut cmd = SimulateCommand::new(storage, Config::default());

        let output = cmd.run(&options(2));

        let report = output.report.unwrap();
        assert_eq!(report.lifetime.minutes, 103);
        assert_eq!(report.lifetime.print_minutes, 52);
        assert_eq!(report.trip.minutes, 13);
    }

    #[test]
    fn test_implausible_feed_rate_warns() {
        let mut cmd = SimulateCommand::new(MemoryStorage::new(), Config::default());

        let output = cmd.run(&SimulateOptions {
            minutes: 3,
            feed_rate: 2000.0,
            ..Default::default()
        });

        assert!(output.success);
        assert!(output.warning.is_some());
        assert_eq!(output.report.unwrap().lifetime.print_centimeters, 0);
    }

    #[test]
    fn test_negative_feed_rate_rejected() {
        let mut cmd = SimulateCommand::new(MemoryStorage::new(), Config::default());

        let output = cmd.run(&SimulateOptions {
            minutes: 3,
            feed_rate: -1.0,
            ..Default::default()
        });

        assert!(!output.success);
        assert!(output.error.unwrap().contains("feed rate"));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("eeprom.bin");

        let storage = FileStorage::open(&path, 4096).unwrap();
        let mut cmd = SimulateCommand::new(storage, Config::default());
        cmd.run(&options(4));

        let reopened = FileStorage::open(&path, 4096).unwrap();
        let saved = read_record(&reopened, &Config::default().layout())
            .unwrap()
            .unwrap();
        assert_eq!(saved.lifetime.minutes, 5);
        assert_eq!(saved.lifetime.print_centimeters, 180);
    }

    #[test]
    fn test_format_output() {
        let mut cmd = SimulateCommand::new(MemoryStorage::new(), Config::default());
        let opts = options(10);
        let output = cmd.run(&opts);

        let text = cmd.format_output(&output, &opts);
        assert!(text.starts_with("Simulated 11 minutes (1 session(s) started, 1 ended), 1 save(s)"));
        assert!(text.contains(" Lifetime - Minutes: 11 Print minutes: 10 Print cm: 540"));

        let json = cmd.format_output(
            &output,
            &SimulateOptions {
                json: true,
                ..opts.clone()
            },
        );
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["saves"], 1);
        assert_eq!(value["report"]["trip"]["print_minutes"], 10);
        assert!(value.get("warning").is_none());

        let quiet = cmd.format_output(
            &output,
            &SimulateOptions {
                quiet: true,
                ..opts
            },
        );
        assert!(quiet.is_empty());
    }
}
