//! Configuration loading for lifestats.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.lifestats/config.toml`)
//! 3. User config (`~/.lifestats/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The defaults reproduce the controller
//! firmware: a 4 KiB EEPROM with the stats record at `0x700`.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{EngineSettings, FeedTracking};
use crate::error::{Result, StatsError};
use crate::storage::memory::DEFAULT_CAPACITY;
use crate::storage::record::DEFAULT_BASE_OFFSET;
use crate::storage::{default_reserved_ranges, RecordLayout, ReservedRange};

/// Main configuration struct for lifestats.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Storage device and record placement.
    pub storage: StorageConfig,
    /// Feed integration tuning.
    pub tracking: FeedTracking,
}

/// Storage device and record placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// EEPROM image file. Defaults to `<home>/eeprom.bin`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    /// Device size in bytes.
    pub capacity: usize,
    /// Offset of the stats record.
    pub base_offset: usize,
    /// Ranges owned by other subsystems that the record must not alias.
    pub reserved: Vec<ReservedRange>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            capacity: DEFAULT_CAPACITY,
            base_offset: DEFAULT_BASE_OFFSET,
            reserved: default_reserved_ranges(),
        }
    }
}

impl Config {
    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load an explicit config file, then apply environment overrides.
    ///
    /// Unlike the layered loaders, a missing or malformed file is an error.
    pub fn load_explicit(path: &Path) -> Result<Self> {
        let mut config = Config::default().merge(Self::load_from_file(path)?);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load user config from `~/.lifestats/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = lifestats_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.lifestats/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&project_config_path(cwd))
    }

    /// Load a config layer that may legitimately be absent.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("ignoring {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Load config from a specific file path.
    fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| StatsError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| StatsError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // LIFESTATS_IMAGE
        if let Ok(val) = env::var("LIFESTATS_IMAGE") {
            if val.is_empty() {
                tracing::warn!("LIFESTATS_IMAGE is empty, ignoring");
            } else {
                self.storage.image_path = Some(PathBuf::from(val));
            }
        }

        // LIFESTATS_BASE_OFFSET
        if let Ok(val) = env::var("LIFESTATS_BASE_OFFSET") {
            match parse_offset(&val) {
                Some(offset) => self.storage.base_offset = offset,
                None => tracing::warn!(
                    "Invalid LIFESTATS_BASE_OFFSET value '{}'. \
                    Expected a decimal or 0x-prefixed offset. Using '{:#x}'.",
                    val,
                    self.storage.base_offset
                ),
            }
        }

        // LIFESTATS_MAX_FEED_DELTA
        if let Ok(val) = env::var("LIFESTATS_MAX_FEED_DELTA") {
            match val.parse::<f32>() {
                Ok(n) if n.is_finite() && n > 0.0 => self.tracking.max_feed_delta = n,
                _ => tracing::warn!(
                    "Invalid LIFESTATS_MAX_FEED_DELTA value '{}'. \
                    Expected a positive number. Using '{}'.",
                    val,
                    self.tracking.max_feed_delta
                ),
            }
        }

        // LIFESTATS_UNIT_LENGTH
        if let Ok(val) = env::var("LIFESTATS_UNIT_LENGTH") {
            match val.parse::<f32>() {
                Ok(n) if n.is_finite() && n > 0.0 => self.tracking.unit_length = n,
                _ => tracing::warn!(
                    "Invalid LIFESTATS_UNIT_LENGTH value '{}'. \
                    Expected a positive number. Using '{}'.",
                    val,
                    self.tracking.unit_length
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Values from `other` take precedence when they differ from the default.
    /// A higher layer therefore cannot reset a value back to its default;
    /// that needs an environment override.
    fn merge(mut self, other: Config) -> Self {
        let default_storage = StorageConfig::default();
        if other.storage.image_path.is_some() {
            self.storage.image_path = other.storage.image_path;
        }
        if other.storage.capacity != default_storage.capacity {
            self.storage.capacity = other.storage.capacity;
        }
        if other.storage.base_offset != default_storage.base_offset {
            self.storage.base_offset = other.storage.base_offset;
        }
        if other.storage.reserved != default_storage.reserved {
            self.storage.reserved = other.storage.reserved;
        }

        let default_tracking = FeedTracking::default();
        if other.tracking.max_feed_delta != default_tracking.max_feed_delta {
            self.tracking.max_feed_delta = other.tracking.max_feed_delta;
        }
        if other.tracking.unit_length != default_tracking.unit_length {
            self.tracking.unit_length = other.tracking.unit_length;
        }

        self
    }

    /// Record placement described by this config.
    pub fn layout(&self) -> RecordLayout {
        RecordLayout::at(self.storage.base_offset)
    }

    /// Engine parameters described by this config.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            layout: self.layout(),
            tracking: self.tracking,
        }
    }

    /// Resolved EEPROM image path.
    pub fn image_path(&self) -> Option<PathBuf> {
        self.storage.image_path.clone().or_else(default_image_path)
    }

    /// Check the record placement and the tracking parameters.
    pub fn validate(&self) -> Result<()> {
        self.layout()
            .validate(self.storage.capacity, &self.storage.reserved)?;
        if !self.tracking.is_valid() {
            return Err(StatsError::config(format!(
                "tracking values must be positive (max_feed_delta = {}, unit_length = {})",
                self.tracking.max_feed_delta, self.tracking.unit_length
            )));
        }
        Ok(())
    }
}

/// Parse a byte offset written in decimal or `0x` hex.
pub fn parse_offset(value: &str) -> Option<usize> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Get the lifestats home directory.
///
/// Checks `LIFESTATS_HOME` first, then falls back to `~/.lifestats`.
/// An empty `LIFESTATS_HOME` is ignored.
pub fn lifestats_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("LIFESTATS_HOME") {
        if home.is_empty() {
            tracing::warn!("LIFESTATS_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("LIFESTATS_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".lifestats"));
    }

    let fallback_path = env::temp_dir().join("lifestats");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Get the default EEPROM image path.
///
/// Returns `<lifestats_home>/eeprom.bin`.
pub fn default_image_path() -> Option<PathBuf> {
    lifestats_home().map(|h| h.join("eeprom.bin"))
}

/// Get the project config path.
///
/// Returns `<cwd>/.lifestats/config.toml`.
pub fn project_config_path(cwd: &Path) -> PathBuf {
    cwd.join(".lifestats").join("config.toml")
}
