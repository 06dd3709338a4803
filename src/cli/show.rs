//! Show command for lifestats.
//!
//! Reads the persisted record and prints the counters.

use serde::Serialize;

use crate::config::Config;
use crate::core::StatsReport;
use crate::error::FailOpen;
use crate::storage::{read_record, NvStorage};

/// Options for the show command.
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Print hours and meters instead of raw counters.
    pub summary: bool,
}

/// Output format for the show command.
#[derive(Debug, Clone, Serialize)]
pub struct ShowOutput {
    /// Whether the counters could be read.
    pub success: bool,
    /// Whether a valid record was found (false means counters are zero).
    pub record_present: bool,
    /// The counters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<StatsReport>,
    /// Error message if show failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShowOutput {
    /// Create a successful output.
    pub fn success(report: StatsReport, record_present: bool) -> Self {
        Self {
            success: true,
            record_present,
            report: Some(report),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            record_present: false,
            report: None,
            error: Some(error.into()),
        }
    }
}

/// The show command implementation.
pub struct ShowCommand<S: NvStorage> {
    storage: S,
    config: Config,
}

impl<S: NvStorage> ShowCommand<S> {
    /// Create a new show command.
    pub fn new(storage: S, config: Config) -> Self {
        Self { storage, config }
    }

    /// Run the show command.
    pub fn run(&self) -> ShowOutput {
        if let Err(err) = self.config.validate() {
            return ShowOutput::failure(err.to_string());
        }

        // An unreadable device shows as zeros rather than failing the command.
        let record = read_record(&self.storage, &self.config.layout())
            .fail_open_with("reading stats record", None);
        let record_present = record.is_some();
        let counters = record.unwrap_or_default();

        ShowOutput::success(StatsReport::new(&counters, false), record_present)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ShowOutput, options: &ShowOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output, options)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &ShowOutput, options: &ShowOptions) -> String {
        match (&output.report, output.success) {
            (Some(report), true) => {
                let body = if options.summary {
                    report.hours_summary()
                } else {
                    report.to_string()
                };
                if output.record_present {
                    format!("{}\n", body)
                } else {
                    format!("{}\n(no stored record, counters start at zero)\n", body)
                }
            }
            _ => format!(
                "Show failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
