//! # WikiSearch
//!
//! A bilingual-agnostic full-text and semantic search engine over a corpus
//! of encyclopedia articles.
//!
//! ## Features
//!
//! - Pluggable text analysis pipeline (stopwords, lemmatization)
//! - Inverted index with two-field BM25 ranking
//! - ANN index over segment embeddings with multi-valued keys
//! - Query spell-correction over a frequency-ordered dictionary
//! - Prefix and next-word autocomplete over static tries
//! - Snippet generation from a content-addressed article store

pub mod analysis;
pub mod autocomplete;
pub mod config;
pub mod embedding;
mod error;
pub mod ingest;
pub mod lexical;
pub mod query;
pub mod semantic;
pub mod snippet;
pub mod spelling;
pub mod storage;
pub mod store;
mod util;

// Re-exports for the public API
pub use analysis::{Analyzer, AnalyzerConfig, Lemmatizer, StopwordSet};
pub use autocomplete::{Autocompleter, CompletionTrie, NextWordTrie};
pub use config::{Bm25Params, SearchConfig};
pub use embedding::{Embedder, PrecomputedEmbedder};
pub use error::{Result, WikiSearchError};
pub use ingest::{Article, IngestPipeline};
pub use lexical::InvertedIndex;
pub use query::{IndexKind, QueryOrchestrator, SearchHit, SearchQuery, SearchResponse};
pub use semantic::{ScoreStrategy, SemanticIndex};
pub use snippet::SnippetService;
pub use spelling::{Dictionary, SpellChecker};
pub use storage::{ByteStore, FileByteStore, MemoryByteStore};
pub use store::{DocumentStore, MemoryRelationalStore, RelationalStore};
pub use util::CancellationToken;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
