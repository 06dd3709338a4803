//! Human-readable rendering of the counters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::counters::{Counters, Totals};

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsReport {
    /// Lifetime totals.
    pub lifetime: Totals,
    /// Trip totals.
    pub trip: Totals,
    /// Whether a printing session was in progress.
    pub printing: bool,
}

impl StatsReport {
    /// Snapshot `counters`.
    pub fn new(counters: &Counters, printing: bool) -> Self {
        Self {
            lifetime: counters.lifetime,
            trip: counters.trip,
            printing,
        }
    }

    /// Two-line `Xh Ym` summary for operators.
    pub fn hours_summary(&self) -> String {
        format!(
            "Lifetime: {} powered, {} printing, {}\nTrip:     {} powered, {} printing, {}",
            hours_minutes(self.lifetime.minutes),
            hours_minutes(self.lifetime.print_minutes),
            meters(self.lifetime.print_centimeters),
            hours_minutes(self.trip.minutes),
            hours_minutes(self.trip.print_minutes),
            meters(self.trip.print_centimeters),
        )
    }
}

fn hours_minutes(minutes: u32) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn meters(centimeters: u32) -> String {
    format!("{}.{:02} m", centimeters / 100, centimeters % 100)
}

impl fmt::Display for StatsReport {
    /// Console layout of the controller's stats dump.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics:")?;
        writeln!(
            f,
            " Lifetime - Minutes: {} Print minutes: {} Print cm: {}",
            self.lifetime.minutes, self.lifetime.print_minutes, self.lifetime.print_centimeters
        )?;
        write!(
            f,
            " Triptime - Minutes: {} Print minutes: {} Print cm: {}",
            self.trip.minutes, self.trip.print_minutes, self.trip.print_centimeters
        )
    }
}
