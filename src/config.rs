//! Configuration for the retrieval subsystem.
//!
//! Every knob has a serde default so a partial JSON file (or an empty one)
//! yields a fully usable configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WikiSearchError};

/// Keyed byte-store holding raw article bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteStoreConfig {
    /// Directory the store writes into.
    pub path: PathBuf,
    /// Upper bound on total stored bytes.
    pub size: u64,
}

impl Default for ByteStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/articles"),
            size: 1_000_000_000,
        }
    }
}

/// ANN index over segment embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnIndexConfig {
    /// On-disk index file, atomically replaced on flush.
    pub path: PathBuf,
    pub dimension: usize,
    /// Flush the index every this many document adds.
    pub save_threshold: usize,
}

impl Default for AnnIndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/semantic.index"),
            dimension: 768,
            save_threshold: 10,
        }
    }
}

/// Spell-checker dictionary files.
///
/// The main dictionary is a word list ordered by corpus frequency; the
/// custom dictionary, if present, is merged after it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellConfig {
    pub dic_path: PathBuf,
    pub custom_dict_path: Option<PathBuf>,
}

/// Autocomplete trie files and suggestion budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteConfig {
    pub completion_trie_path: PathBuf,
    pub next_word_trie_path: PathBuf,
    pub num_suggestions: usize,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            completion_trie_path: PathBuf::from("./data/completion.trie"),
            next_word_trie_path: PathBuf::from("./data/next_word.trie"),
            num_suggestions: 10,
        }
    }
}

/// BM25 ranking constants.
///
/// `k1` is deliberately below the textbook 1.2-2.0 range: term presence
/// matters more than within-document saturation for encyclopedia articles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 0.5, b: 0.75 }
    }
}

/// Embedding segmentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Maximum segment length in characters; sentences are never split.
    pub max_segment_len: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            max_segment_len: 512,
        }
    }
}

/// Relational store tuning.
///
/// `pool_size` applies to networked `RelationalStore` implementations; the
/// embedded store synchronizes through its interior lock instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalConfig {
    pub pool_size: usize,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self { pool_size: 10 }
    }
}

/// Aggregate configuration for the whole retrieval subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub byte_store: ByteStoreConfig,
    pub ann_index: AnnIndexConfig,
    pub spell: SpellConfig,
    pub autocomplete: AutocompleteConfig,
    pub bm25: Bm25Params,
    pub embedding: EmbeddingConfig,
    pub relational: RelationalConfig,
}

impl SearchConfig {
    /// Load configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            WikiSearchError::resource(format!("cannot open config {}: {e}", path.display()))
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            WikiSearchError::resource(format!("cannot parse config {}: {e}", path.display()))
        })
    }
}
