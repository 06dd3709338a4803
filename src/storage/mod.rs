//! Non-volatile storage for lifestats.
//!
//! This module provides the word-addressed storage abstraction, its
//! in-memory and file-backed devices, and the persisted record protocol.

pub mod file;
pub mod memory;
pub mod record;
pub mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use record::{
    default_reserved_ranges, read_record, write_record, RecordLayout, ReservedRange,
    LIFETIME_MAGIC, RECORD_SIZE, REGION_SIZE,
};
pub use traits::NvStorage;
