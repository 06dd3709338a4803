//! File-backed EEPROM image for lifestats.
//!
//! The image lives in `~/.lifestats/eeprom.bin` by default. A missing file
//! reads as a freshly erased device. Every word write rewrites the image
//! via temp file + rename, so a crash mid-write leaves either the old or
//! the new image on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::default_image_path;
use crate::error::{Result, StatsError};
use crate::storage::memory::{DEFAULT_CAPACITY, ERASED_BYTE};
use crate::storage::traits::WORD_SIZE;
use crate::storage::NvStorage;

/// File-based storage device.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Path of the image file.
    path: PathBuf,
    /// Cached device contents.
    bytes: Vec<u8>,
}

impl FileStorage {
    /// Open the image at the default location.
    pub fn new() -> Result<Self> {
        let path = default_image_path().ok_or_else(|| {
            StatsError::config("Could not determine image path (no home directory)")
        })?;
        Self::open(path, DEFAULT_CAPACITY)
    }

    /// Open or create an image of `capacity` bytes at `path`.
    ///
    /// A shorter existing image is padded with erased bytes; a longer one
    /// is rejected rather than silently truncated.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StatsError::storage(parent, e))?;
            }
        }

        let mut bytes = if path.exists() {
            fs::read(&path).map_err(|e| StatsError::storage(&path, e))?
        } else {
            Vec::new()
        };

        if bytes.len() > capacity {
            return Err(StatsError::config(format!(
                "image {} is {} bytes, larger than the configured capacity of {} bytes",
                path.display(),
                bytes.len(),
                capacity
            )));
        }
        bytes.resize(capacity, ERASED_BYTE);

        Ok(Self { path, bytes })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path for the temp file used during atomic writes.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "eeprom.bin".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    /// Write the image atomically using temp file + rename.
    fn flush(&self) -> Result<()> {
        let temp_path = self.temp_path();

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| StatsError::storage(&temp_path, e))?;
            file.write_all(&self.bytes)
                .map_err(|e| StatsError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| StatsError::storage(&temp_path, e))?;
        }

        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, &self.path).map_err(|e| StatsError::storage(&self.path, e))?;

        Ok(())
    }
}

impl NvStorage for FileStorage {
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
        let previous = self.read_word(offset)?;
        self.bytes[offset..offset + WORD_SIZE].copy_from_slice(&value.to_le_bytes());
        if let Err(err) = self.flush() {
            // Keep the cache in step with the file.
            self.bytes[offset..offset + WORD_SIZE].copy_from_slice(&previous.to_le_bytes());
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_nv_storage_words;
    use tempfile::TempDir;

    fn create_test_storage() -> (FileStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("eeprom.bin"), 256).unwrap();
        (storage, dir)
    }

    #[test]
    fn test_file_storage_words() {
        let (mut storage, _dir) = create_test_storage();
        test_nv_storage_words(&mut storage);
    }

    #[test]
    fn test_missing_file_reads_erased() {
        let (storage, _dir) = create_test_storage();
        assert!(!storage.path().exists());
        assert_eq!(storage.capacity(), 256);
        assert_eq!(storage.read_word(0).unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("eeprom.bin");

        let _storage = FileStorage::open(&nested, 64).unwrap();

        assert!(nested.parent().unwrap().is_dir());
    }

    #[test]
    fn test_writes_persist_across_opens() {
        let (mut storage, dir) = create_test_storage();
        storage.write_word(0x10, 1234).unwrap();

        let reopened = FileStorage::open(dir.path().join("eeprom.bin"), 256).unwrap();
        assert_eq!(reopened.read_word(0x10).unwrap(), 1234);
        assert_eq!(fs::metadata(reopened.path()).unwrap().len(), 256);
    }

    #[test]
    fn test_short_image_is_padded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");
        fs::write(&path, [0u8; 8]).unwrap();

        let storage = FileStorage::open(&path, 32).unwrap();

        assert_eq!(storage.read_word(4).unwrap(), 0);
        assert_eq!(storage.read_word(8).unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_oversized_image_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");
        fs::write(&path, [0u8; 64]).unwrap();

        let result = FileStorage::open(&path, 32);
        assert!(matches!(result, Err(StatsError::Config { .. })));
    }

    #[test]
    fn test_temp_file_cleaned_up() {
        let (mut storage, _dir) = create_test_storage();
        storage.write_word(0, 1).unwrap();
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn test_failed_flush_keeps_cache_consistent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eeprom.bin");
        let mut storage = FileStorage::open(&path, 16).unwrap();

        // Block the temp file path with a directory so the write fails.
        fs::create_dir(storage.temp_path()).unwrap();

        assert!(storage.write_word(0, 42).is_err());
        assert_eq!(storage.read_word(0).unwrap(), 0xFFFF_FFFF);
    }
}
