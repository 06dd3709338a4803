//! Lifetime and trip usage counters.

use serde::{Deserialize, Serialize};

/// One set of usage totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Minutes the controller has been powered.
    pub minutes: u32,
    /// Minutes spent printing.
    pub print_minutes: u32,
    /// Filament consumed, in whole centimeters.
    pub print_centimeters: u32,
}

impl Totals {
    /// Count one powered minute.
    pub fn tick_minute(&mut self) {
        self.minutes = self.minutes.wrapping_add(1);
    }

    /// Count one printing minute.
    pub fn tick_print_minute(&mut self) {
        self.print_minutes = self.print_minutes.wrapping_add(1);
    }

    /// Add whole centimeters of printed filament.
    pub fn add_centimeters(&mut self, units: u32) {
        self.print_centimeters = self.print_centimeters.wrapping_add(units);
    }
}

/// Lifetime totals plus the resettable trip totals.
///
/// Both sets advance together; only [`Counters::reset_trip`] makes them
/// diverge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Totals over the whole life of the machine.
    pub lifetime: Totals,
    /// Totals since the last trip reset.
    pub trip: Totals,
}

impl Counters {
    /// Count one powered minute on both sets.
    pub fn tick_minute(&mut self) {
        self.lifetime.tick_minute();
        self.trip.tick_minute();
    }

    /// Count one printing minute on both sets.
    pub fn tick_print_minute(&mut self) {
        self.lifetime.tick_print_minute();
        self.trip.tick_print_minute();
    }

    /// Add printed centimeters to both sets.
    pub fn add_centimeters(&mut self, units: u32) {
        self.lifetime.add_centimeters(units);
        self.trip.add_centimeters(units);
    }

    /// Zero the trip totals. Lifetime totals are untouched.
    pub fn reset_trip(&mut self) {
        self.trip = Totals::default();
    }

    /// Counter words in persisted order.
    pub fn to_words(&self) -> [u32; 6] {
        [
            self.lifetime.minutes,
            self.lifetime.print_minutes,
            self.lifetime.print_centimeters,
            self.trip.minutes,
            self.trip.print_minutes,
            self.trip.print_centimeters,
        ]
    }

    /// Rebuild counters from words in persisted order.
    pub fn from_words(words: [u32; 6]) -> Self {
        let [lm, lpm, lpc, tm, tpm, tpc] = words;
        Self {
            lifetime: Totals {
                minutes: lm,
                print_minutes: lpm,
                print_centimeters: lpc,
            },
            trip: Totals {
                minutes: tm,
                print_minutes: tpm,
                print_centimeters: tpc,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Counters {
        Counters::from_words([1000, 400, 9000, 30, 12, 250])
    }

    #[test]
    fn test_word_order() {
        let counters = sample();
        assert_eq!(counters.lifetime.minutes, 1000);
        assert_eq!(counters.lifetime.print_centimeters, 9000);
        assert_eq!(counters.trip.minutes, 30);
        assert_eq!(counters.trip.print_centimeters, 250);
        assert_eq!(counters.to_words(), [1000, 400, 9000, 30, 12, 250]);
    }

    #[test]
    fn test_reset_trip_leaves_lifetime() {
        let mut counters = sample();
        let lifetime = counters.lifetime;

        counters.reset_trip();

        assert_eq!(counters.trip, Totals::default());
        assert_eq!(counters.lifetime, lifetime);
    }

    #[test]
    fn test_ticks_advance_both_sets() {
        let mut counters = Counters::default();
        counters.tick_minute();
        counters.tick_print_minute();
        counters.add_centimeters(3);

        let expected = Totals {
            minutes: 1,
            print_minutes: 1,
            print_centimeters: 3,
        };
        assert_eq!(counters.lifetime, expected);
        assert_eq!(counters.trip, expected);
    }

    #[test]
    fn test_trip_diverges_after_reset() {
        let mut counters = Counters::default();
        counters.tick_minute();
        counters.reset_trip();
        counters.tick_minute();

        assert_eq!(counters.lifetime.minutes, 2);
        assert_eq!(counters.trip.minutes, 1);
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["lifetime"]["print_minutes"], 400);
        assert_eq!(json["trip"]["print_centimeters"], 250);
    }
}
