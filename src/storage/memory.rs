//! In-memory byte store.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::Result;
use crate::storage::ByteStore;

#[derive(Debug, Default)]
pub struct MemoryByteStore {
    entries: RwLock<AHashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ByteStore for MemoryByteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}
