//! The relational store interface.
//!
//! A narrow trait covering the handful of operations the inverted index
//! actually performs, instead of exposing cursors or SQL. Implementations
//! may be embedded (see [`crate::store::memory`]) or networked; either way
//! all writes happen during offline ingest and reads are lock-scoped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The two indexed document fields, each with its own posting stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Body,
}

/// Document identity and display metadata. Immutable after ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub doc_id: u64,
    pub title: String,
    pub url: String,
}

/// One `(term, document)` frequency row from a per-field tf table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfRow {
    pub doc_id: u64,
    pub lemma_id: u64,
    pub frequency: u64,
    pub field: Field,
}

/// Everything the analyzer extracted from one document, applied to the
/// store as a single transaction.
#[derive(Debug, Clone, Default)]
pub struct TermIngest {
    /// Retained surface forms paired with their lemmas, both fields.
    pub word_lemmas: Vec<(String, String)>,
    /// Title term frequencies keyed by lemma token.
    pub title_tf: HashMap<String, u64>,
    /// Body term frequencies keyed by lemma token.
    pub body_tf: HashMap<String, u64>,
    /// Ordered body tokens (including sentence terminators); the index of a
    /// token is its posting position.
    pub position_tokens: Vec<String>,
}

/// Operations the retrieval subsystem needs from the relational schema.
pub trait RelationalStore: Send + Sync {
    /// Register a document's identity row.
    fn insert_document(&self, meta: &DocumentMeta) -> Result<()>;

    /// Remove a document's identity row, rolling back a failed ingest so a
    /// retry of the same id starts clean. Removing an unknown id is a
    /// no-op.
    fn remove_document(&self, doc_id: u64) -> Result<()>;

    fn document_meta(&self, doc_id: u64) -> Result<Option<DocumentMeta>>;

    fn document_count(&self) -> Result<u64>;

    /// Apply one document's term data atomically: upsert words, lemmas and
    /// their associations, add per-field term frequencies (adding to any
    /// existing row for the same term and document), and insert postings.
    fn ingest_terms(&self, doc_id: u64, ingest: TermIngest) -> Result<()>;

    /// Resolve lemma tokens to ids; unknown tokens are absent from the map.
    fn lemma_ids(&self, tokens: &[String]) -> Result<HashMap<String, u64>>;

    /// All tf rows for the given lemma ids, both fields.
    fn term_frequencies(&self, lemma_ids: &[u64]) -> Result<Vec<TfRow>>;

    /// Distinct documents containing the lemma in the given field.
    fn document_frequency(&self, field: Field, lemma_id: u64) -> Result<u64>;

    /// Sum of term frequencies of a document in the given field.
    fn field_length(&self, field: Field, doc_id: u64) -> Result<u64>;

    /// Mean field length over documents with at least one row in the field;
    /// zero for an empty field.
    fn average_field_length(&self, field: Field) -> Result<f64>;

    /// Distinct lowercased surface words, sorted; feeds the completion trie.
    fn vocabulary(&self) -> Result<Vec<String>>;

    /// Surface words with their posting counts, most frequent first; feeds
    /// the spell dictionary.
    fn word_frequencies(&self) -> Result<Vec<(String, u64)>>;

    /// Adjacent-position word pairs as `"w1 w2"` strings with their corpus
    /// counts, most frequent first (ties lexicographic); feeds the
    /// next-word trie. Pairs never span sentence terminators because
    /// terminators consume positions without producing postings.
    fn bigram_frequencies(&self) -> Result<Vec<(String, u64)>>;
}
