//! In-memory EEPROM image for testing.
//!
//! This module provides a RAM-backed implementation of the `NvStorage`
//! trait that also keeps a log of every word written, so tests can assert
//! on write counts and ordering.

use crate::error::Result;
use crate::storage::traits::WORD_SIZE;
use crate::storage::NvStorage;

/// Byte value of an erased EEPROM cell.
pub const ERASED_BYTE: u8 = 0xFF;

/// Default device size, matching an ATmega2560 EEPROM.
pub const DEFAULT_CAPACITY: usize = 4096;

/// In-memory storage device.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    /// Device contents.
    bytes: Vec<u8>,
    /// Every `(offset, value)` written, oldest first.
    writes: Vec<(usize, u32)>,
}

impl MemoryStorage {
    /// Create an erased device of the default size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an erased device of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED_BYTE; capacity],
            writes: Vec::new(),
        }
    }

    /// Raw device contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Word writes performed so far, oldest first.
    pub fn writes(&self) -> &[(usize, u32)] {
        &self.writes
    }

    /// Number of word writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Forget the write log without touching the contents.
    pub fn clear_log(&mut self) {
        self.writes.clear();
    }

    /// Return every byte to the erased state.
    pub fn erase(&mut self) {
        self.bytes.fill(ERASED_BYTE);
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NvStorage for MemoryStorage {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read_word(&self, offset: usize) -> Result<u32> {
        self.check_word(offset)?;
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(&self.bytes[offset..offset + WORD_SIZE]);
        Ok(u32::from_le_bytes(word))
    }

    fn write_word(&mut self, offset: usize, value: u32) -> Result<()> {
        self.check_word(offset)?;
        self.bytes[offset..offset + WORD_SIZE].copy_from_slice(&value.to_le_bytes());
        self.writes.push((offset, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_nv_storage_words;

    #[test]
    fn test_memory_storage_words() {
        let mut storage = MemoryStorage::new();
        test_nv_storage_words(&mut storage);
    }

    #[test]
    fn test_new_storage_is_erased() {
        let storage = MemoryStorage::with_capacity(64);
        assert_eq!(storage.capacity(), 64);
        assert!(storage.as_bytes().iter().all(|b| *b == ERASED_BYTE));
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut storage = MemoryStorage::with_capacity(8);
        storage.write_word(0, 0x2624_BA15).unwrap();
        assert_eq!(&storage.as_bytes()[..4], &[0x15, 0xBA, 0x24, 0x26]);
    }

    #[test]
    fn test_write_log_order() {
        let mut storage = MemoryStorage::with_capacity(16);
        storage.write_word(8, 2).unwrap();
        storage.write_word(0, 1).unwrap();

        assert_eq!(storage.writes(), &[(8, 2), (0, 1)]);
        assert_eq!(storage.write_count(), 2);

        storage.clear_log();
        assert_eq!(storage.write_count(), 0);
        assert_eq!(storage.read_word(8).unwrap(), 2);
    }

    #[test]
    fn test_failed_write_not_logged() {
        let mut storage = MemoryStorage::with_capacity(4);
        assert!(storage.write_word(1, 0).is_err());
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn test_erase() {
        let mut storage = MemoryStorage::with_capacity(8);
        storage.write_word(0, 0).unwrap();
        storage.erase();
        assert_eq!(storage.read_word(0).unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_borrowed_storage() {
        let mut storage = MemoryStorage::with_capacity(8);
        {
            let borrowed = &mut storage;
            borrowed.write_word(4, 99).unwrap();
            assert_eq!(NvStorage::capacity(&borrowed), 8);
        }
        assert_eq!(storage.read_word(4).unwrap(), 99);
    }
}
