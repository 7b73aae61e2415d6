//! Pluggable byte storage.
//!
//! A narrow capability interface over any embedded key-value store, with an
//! in-memory backend for tests and a file-per-key backend for production.

pub mod file;
pub mod memory;

pub use file::FileByteStore;
pub use memory::MemoryByteStore;

use crate::error::Result;

/// Keyed byte storage.
///
/// Reads take a lightweight snapshot per call; writes happen only during
/// offline ingest.
pub trait ByteStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
}
