//! Raw article storage keyed by document id.

use std::sync::Arc;

use crate::error::{Result, WikiSearchError};
use crate::storage::ByteStore;

/// Content store for raw article bodies.
///
/// Bodies are UTF-8 text keyed by the decimal string form of the document
/// id, so any [`ByteStore`] backend works unchanged.
pub struct DocumentStore {
    store: Arc<dyn ByteStore>,
}

impl DocumentStore {
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self { store }
    }

    pub fn put_article(&self, doc_id: u64, body: &str) -> Result<()> {
        self.store.put(doc_id.to_string().as_bytes(), body.as_bytes())
    }

    /// Fetch and decode an article body; `None` when the id is unknown.
    pub fn article(&self, doc_id: u64) -> Result<Option<String>> {
        match self.store.get(doc_id.to_string().as_bytes())? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| {
                    WikiSearchError::encoding(format!("article {doc_id} is not valid UTF-8: {e}"))
                }),
            None => Ok(None),
        }
    }
}
