//! File-per-key byte store.
//!
//! Keys are hex-encoded into file names, so arbitrary key bytes are safe.
//! A configured size budget bounds total stored bytes; writes beyond it
//! fail with a resource error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;

use crate::config::ByteStoreConfig;
use crate::error::{Result, WikiSearchError};
use crate::storage::ByteStore;

#[derive(Debug)]
pub struct FileByteStore {
    dir: PathBuf,
    size_budget: u64,
    used: AtomicU64,
}

impl FileByteStore {
    /// Open (creating if needed) the store directory and take stock of the
    /// bytes already used.
    pub fn open(config: &ByteStoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path).map_err(|e| {
            WikiSearchError::resource(format!(
                "cannot create byte store at {}: {e}",
                config.path.display()
            ))
        })?;

        let mut used = 0u64;
        for entry in fs::read_dir(&config.path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                used += entry.metadata()?.len();
            }
        }
        info!(
            "opened byte store at {} ({used} of {} bytes used)",
            config.path.display(),
            config.size
        );

        Ok(Self {
            dir: config.path.clone(),
            size_budget: config.size,
            used: AtomicU64::new(used),
        })
    }

    fn key_path(&self, key: &[u8]) -> PathBuf {
        let mut name = String::with_capacity(key.len() * 2 + 4);
        for byte in key {
            name.push_str(&format!("{byte:02x}"));
        }
        name.push_str(".bin");
        self.dir.join(name)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ByteStore for FileByteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WikiSearchError::store(format!("byte store read failed: {e}"))),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let path = self.key_path(key);
        let previous = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        let used = self.used.load(Ordering::SeqCst);
        let projected = used - previous + value.len() as u64;
        if projected > self.size_budget {
            return Err(WikiSearchError::resource(format!(
                "byte store over budget: {projected} > {} bytes",
                self.size_budget
            )));
        }

        fs::write(&path, value)
            .map_err(|e| WikiSearchError::store(format!("byte store write failed: {e}")))?;
        self.used
            .store(used - previous + value.len() as u64, Ordering::SeqCst);
        Ok(())
    }
}
