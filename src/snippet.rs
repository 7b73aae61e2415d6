//! Result snippet generation.

use std::sync::Arc;

use log::warn;

use crate::error::Result;
use crate::store::DocumentStore;

/// Default snippet length in codepoints.
pub const DEFAULT_SNIPPET_CHARS: usize = 200;

/// Extracts result summaries from stored article bodies.
pub struct SnippetService {
    documents: Arc<DocumentStore>,
}

impl SnippetService {
    pub fn new(documents: Arc<DocumentStore>) -> Self {
        Self { documents }
    }

    /// The first `max_chars` codepoints of the article body with newlines
    /// flattened to spaces. A missing body yields an empty summary.
    pub fn summarize_static(&self, doc_id: u64, max_chars: usize) -> Result<String> {
        match self.documents.article(doc_id)? {
            Some(body) => Ok(body.replace('\n', " ").chars().take(max_chars).collect()),
            None => {
                warn!("no stored body for document {doc_id}; returning empty summary");
                Ok(String::new())
            }
        }
    }

    /// Query-aware summaries are reserved; empty until implemented.
    pub fn summarize_dynamic(&self, _doc_id: u64, _max_chars: usize) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryByteStore;

    fn service_with(doc_id: u64, body: &str) -> SnippetService {
        let store = Arc::new(DocumentStore::new(Arc::new(MemoryByteStore::new())));
        store.put_article(doc_id, body).unwrap();
        SnippetService::new(store)
    }

    #[test]
    fn test_static_summary_flattens_newlines_and_truncates() {
        let service = service_with(1, "line one\nline two\nline three");
        let summary = service.summarize_static(1, 12).unwrap();
        assert_eq!(summary, "line one lin");
    }

    #[test]
    fn test_truncation_is_codepoint_wise() {
        let service = service_with(2, "българският език");
        let summary = service.summarize_static(2, 10).unwrap();
        assert_eq!(summary.chars().count(), 10);
    }

    #[test]
    fn test_missing_document_yields_empty_summary() {
        let service = service_with(1, "body");
        assert_eq!(service.summarize_static(99, 200).unwrap(), "");
    }

    #[test]
    fn test_dynamic_summary_reserved() {
        let service = service_with(1, "body");
        assert_eq!(service.summarize_dynamic(1, 200), "");
    }
}
