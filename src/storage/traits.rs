//! Non-volatile storage traits for lifestats.
//!
//! This module defines the `NvStorage` trait: a byte-addressable device
//! accessed as 32-bit little-endian words at fixed offsets, like an AVR
//! EEPROM.

use crate::error::{Result, StatsError};

/// Size of one storage word in bytes.
pub const WORD_SIZE: usize = 4;

/// Trait for word-addressed non-volatile storage backends.
pub trait NvStorage {
    /// Device size in bytes.
    fn capacity(&self) -> usize;

    /// Read the 32-bit word starting at byte `offset`.
    fn read_word(&self, offset: usize) -> Result<u32>;

    /// Write the 32-bit word starting at byte `offset`.
    fn write_word(&mut self, offset: usize, value: u32) -> Result<()>;

    /// Check that a whole word starting at `offset` lies inside the device.
    fn check_word(&self, offset: usize) -> Result<()> {
        match offset.checked_add(WORD_SIZE) {
            Some(end) if end <= self.capacity() => Ok(()),
            _ => Err(StatsError::out_of_range(offset, self.capacity())),
        }
    }
}

/// Blanket implementation so engines can borrow a backend instead of owning it.
impl<T: NvStorage + ?Sized> NvStorage for &mut T {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn read_word(&self, offset: usize) -> Result<u32> {
        (**self).read_word(offset)
    }

    fn write_word(&mut self, offset: usize, value: u32) -> Result<()> {
        (**self).write_word(offset, value)
    }
}

/// Test utilities for NvStorage implementations.
#[cfg(test)]
pub mod tests {
    use super::*;

    /// Test helper to verify NvStorage implementations.
    pub fn test_nv_storage_words<S: NvStorage>(storage: &mut S) {
        let last = storage.capacity() - WORD_SIZE;

        // Fresh devices read as erased
        assert_eq!(storage.read_word(0).unwrap(), 0xFFFF_FFFF);

        storage.write_word(0, 0x2624_BA15).unwrap();
        storage.write_word(4, 7).unwrap();
        storage.write_word(last, 0xDEAD_BEEF).unwrap();

        assert_eq!(storage.read_word(0).unwrap(), 0x2624_BA15);
        assert_eq!(storage.read_word(4).unwrap(), 7);
        assert_eq!(storage.read_word(last).unwrap(), 0xDEAD_BEEF);

        // Overwrite in place
        storage.write_word(4, 8).unwrap();
        assert_eq!(storage.read_word(4).unwrap(), 8);

        // Unaligned offsets are fine, the device is byte-addressed
        storage.write_word(9, 0x0102_0304).unwrap();
        assert_eq!(storage.read_word(9).unwrap(), 0x0102_0304);

        // Past the end is rejected
        assert!(matches!(
            storage.read_word(last + 1),
            Err(StatsError::OutOfRange { .. })
        ));
        assert!(storage.write_word(storage.capacity(), 0).is_err());
        assert!(storage.read_word(usize::MAX).is_err());
    }
}
