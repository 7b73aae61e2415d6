//! Lexical retrieval: the inverted index with BM25 ranking.

mod searcher;
mod writer;

use std::sync::Arc;

use log::debug;

use crate::analysis::Analyzer;
use crate::config::Bm25Params;
use crate::error::Result;
use crate::store::RelationalStore;

/// The inverted index over title and body posting streams.
///
/// The index itself is stateless between calls; all persistent state lives
/// in the [`RelationalStore`]. Writes happen during offline ingest, reads
/// run concurrently at query time.
pub struct InvertedIndex {
    store: Arc<dyn RelationalStore>,
    analyzer: Arc<Analyzer>,
    params: Bm25Params,
}

impl InvertedIndex {
    pub fn new(store: Arc<dyn RelationalStore>, analyzer: Arc<Analyzer>, params: Bm25Params) -> Self {
        Self {
            store,
            analyzer,
            params,
        }
    }

    /// Index one document: words, lemmas, per-field term frequencies and
    /// body postings, applied to the store as a single transaction.
    pub fn store_document(&self, doc_id: u64, title: &str, body: &str) -> Result<()> {
        let ingest = writer::build_ingest(&self.analyzer, title, body);
        debug!(
            "indexing document {doc_id}: {} title terms, {} body terms, {} positions",
            ingest.title_tf.len(),
            ingest.body_tf.len(),
            ingest.position_tokens.len()
        );
        self.store.ingest_terms(doc_id, ingest)
    }

    /// Rank documents for `query` by two-field BM25, score descending.
    ///
    /// Returns at most `limit` `(doc_id, score)` pairs after skipping
    /// `offset`. An empty query or a query with no known lemmas yields an
    /// empty result.
    pub fn search(&self, query: &str, limit: usize, offset: usize) -> Result<Vec<(u64, f64)>> {
        let lemmas = self.analyzer.tokenize(query);
        if lemmas.is_empty() {
            return Ok(Vec::new());
        }
        searcher::search(self.store.as_ref(), self.params, &lemmas, limit, offset)
    }

    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    pub fn relational_store(&self) -> &Arc<dyn RelationalStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stopwords::StopwordSet;
    use crate::analysis::{AnalyzerConfig, IdentityLemmatizer};
    use crate::store::MemoryRelationalStore;
    use crate::store::relational::DocumentMeta;

    fn test_index() -> InvertedIndex {
        let analyzer = Analyzer::new(
            AnalyzerConfig::default(),
            StopwordSet::from_words(["is", "the", "of", "an"]),
            Arc::new(IdentityLemmatizer),
        );
        InvertedIndex::new(
            Arc::new(MemoryRelationalStore::new()),
            Arc::new(analyzer),
            Bm25Params::default(),
        )
    }

    fn register(index: &InvertedIndex, doc_id: u64, title: &str, body: &str) {
        index
            .relational_store()
            .insert_document(&DocumentMeta {
                doc_id,
                title: title.to_string(),
                url: format!("https://wiki.example/{doc_id}"),
            })
            .unwrap();
        index.store_document(doc_id, title, body).unwrap();
    }

    #[test]
    fn test_ingested_term_is_findable() {
        let index = test_index();
        register(&index, 1, "Sofia", "Sofia is the capital of Bulgaria.");

        let hits = index.search("capital", 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 1);
        assert!(hits[0].1.is_finite());
    }

    #[test]
    fn test_empty_and_unknown_queries() {
        let index = test_index();
        register(&index, 1, "Sofia", "Sofia is the capital of Bulgaria.");

        assert!(index.search("", 10, 0).unwrap().is_empty());
        assert!(index.search("the of", 10, 0).unwrap().is_empty());
        assert!(index.search("zzz", 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_results_sorted_bounded_unique() {
        let index = test_index();
        register(&index, 1, "Sofia", "Sofia is the capital of Bulgaria. Sofia is large.");
        register(&index, 2, "Plovdiv", "Plovdiv is an ancient city near Sofia.");
        register(&index, 3, "Varna", "Varna is a coastal city.");

        let hits = index.search("sofia city", 2, 0).unwrap();
        assert!(hits.len() <= 2);
        let mut doc_ids: Vec<u64> = hits.iter().map(|(d, _)| *d).collect();
        doc_ids.dedup();
        assert_eq!(doc_ids.len(), hits.len());
        for pair in hits.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_offset_pagination() {
        let index = test_index();
        register(&index, 1, "Sofia", "Sofia is the capital of Bulgaria.");
        register(&index, 2, "Plovdiv", "Plovdiv is an ancient city near Sofia.");

        let all = index.search("sofia", 10, 0).unwrap();
        assert_eq!(all.len(), 2);
        let tail = index.search("sofia", 10, 1).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].0, all[1].0);
        assert!(index.search("sofia", 10, 5).unwrap().is_empty());
    }

    #[test]
    fn test_title_match_ranks_named_document_first() {
        let index = test_index();
        register(&index, 1, "Sofia", "Sofia is the capital of Bulgaria.");
        register(&index, 2, "Plovdiv", "Plovdiv is an ancient city. Sofia is far away.");

        let hits = index.search("plovdiv", 10, 0).unwrap();
        assert_eq!(hits[0].0, 2);
    }
}
