//! Persisted stats record: layout, load and save.
//!
//! The record is seven little-endian words at a fixed base offset:
//!
//! | word | content                      |
//! |------|------------------------------|
//! | 0    | `LIFETIME_MAGIC`             |
//! | 1    | lifetime minutes             |
//! | 2    | lifetime print minutes       |
//! | 3    | lifetime print centimeters   |
//! | 4    | trip minutes                 |
//! | 5    | trip print minutes           |
//! | 6    | trip print centimeters       |
//!
//! A record whose magic word does not match is treated as absent. Writes are
//! not atomic: the magic goes first, which only helps the very first save.
//! Once a valid record exists, power loss mid-save leaves a mix of old and
//! new counters behind a valid magic, and that mix is loaded as-is.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::core::Counters;
use crate::error::{FailOpen, Result, StatsError};
use crate::storage::traits::WORD_SIZE;
use crate::storage::NvStorage;

/// Marker distinguishing a written record from erased or foreign data.
pub const LIFETIME_MAGIC: u32 = 0x2624_BA15;

/// Default base offset of the stats region.
pub const DEFAULT_BASE_OFFSET: usize = 0x700;

/// Bytes reserved for the stats region, leaving headroom for new fields.
pub const REGION_SIZE: usize = 256;

/// Words in the current record (magic + six counters).
pub const RECORD_WORDS: usize = 7;

/// Bytes in the current record.
pub const RECORD_SIZE: usize = RECORD_WORDS * WORD_SIZE;

/// A storage range owned by another subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedRange {
    /// Owner, for error messages.
    pub name: String,
    /// First byte.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
}

impl ReservedRange {
    /// Create a reserved range.
    pub fn new(name: impl Into<String>, start: usize, len: usize) -> Self {
        Self {
            name: name.into(),
            start,
            len,
        }
    }

    /// Byte range covered.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start.saturating_add(self.len)
    }
}

/// Ranges used by the rest of the firmware.
///
/// General settings start at offset 100 and may grow up to the stats
/// region; material profiles start at 0x800 and are 385 bytes long.
pub fn default_reserved_ranges() -> Vec<ReservedRange> {
    vec![
        ReservedRange::new("settings", 0x064, DEFAULT_BASE_OFFSET - 0x064),
        ReservedRange::new("material profiles", 0x800, 385),
    ]
}

/// Where the stats record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    /// Offset of the magic word.
    pub base: usize,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_OFFSET,
        }
    }
}

impl RecordLayout {
    /// Layout rooted at `base`.
    pub fn at(base: usize) -> Self {
        Self { base }
    }

    /// Byte offset of word `index`.
    pub fn word_offset(&self, index: usize) -> usize {
        self.base + index * WORD_SIZE
    }

    /// Bytes reserved for the region.
    pub fn region(&self) -> Range<usize> {
        self.base..self.base.saturating_add(REGION_SIZE)
    }

    /// Check the region fits the device and aliases no reserved range.
    pub fn validate(&self, capacity: usize, reserved: &[ReservedRange]) -> Result<()> {
        let region = self.region();
        if region.end > capacity {
            return Err(StatsError::layout(format!(
                "stats region {:#06x}..{:#06x} exceeds device capacity of {} bytes",
                region.start, region.end, capacity
            )));
        }

        for range in reserved {
            let other = range.range();
            if region.start < other.end && other.start < region.end {
                return Err(StatsError::layout(format!(
                    "stats region {:#06x}..{:#06x} overlaps {} at {:#06x}..{:#06x}",
                    region.start, region.end, range.name, other.start, other.end
                )));
            }
        }

        Ok(())
    }
}

/// Read the record; `Ok(None)` when the magic word does not match.
pub fn read_record<S: NvStorage + ?Sized>(
    storage: &S,
    layout: &RecordLayout,
) -> Result<Option<Counters>> {
    let magic = storage.read_word(layout.word_offset(0))?;
    if magic != LIFETIME_MAGIC {
        return Ok(None);
    }

    let mut words = [0u32; RECORD_WORDS - 1];
    for (i, word) in words.iter_mut().enumerate() {
        *word = storage.read_word(layout.word_offset(i + 1))?;
    }
    Ok(Some(Counters::from_words(words)))
}

/// Write the magic word followed by the six counters.
pub fn write_record<S: NvStorage + ?Sized>(
    storage: &mut S,
    layout: &RecordLayout,
    counters: &Counters,
) -> Result<()> {
    storage.write_word(layout.word_offset(0), LIFETIME_MAGIC)?;
    for (i, word) in counters.to_words().into_iter().enumerate() {
        storage.write_word(layout.word_offset(i + 1), word)?;
    }
    Ok(())
}

/// Load persisted counters, or zeros when no valid record exists.
///
/// Never fails: a read error is logged and handled like an absent record.
/// Values behind a matching magic are adopted verbatim.
pub fn load<S: NvStorage + ?Sized>(storage: &S, layout: &RecordLayout) -> Counters {
    match read_record(storage, layout).fail_open_default("load lifetime stats") {
        Some(counters) => {
            tracing::debug!(base = layout.base, "loaded lifetime stats");
            counters
        }
        None => {
            tracing::debug!(base = layout.base, "no valid lifetime stats, starting at zero");
            Counters::default()
        }
    }
}

/// Persist counters. Failures are logged and swallowed.
pub fn save<S: NvStorage + ?Sized>(storage: &mut S, layout: &RecordLayout, counters: &Counters) {
    write_record(storage, layout, counters).fail_open_default("save lifetime stats");
}
