//! Embedder backed by a precomputed text-to-vector table.
//!
//! Useful when embeddings are produced by an offline batch job, and for
//! tests that need deterministic vectors without a model.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::embedding::embedder::{Embedder, l2_normalize};
use crate::error::{Result, WikiSearchError};

pub struct PrecomputedEmbedder {
    dimension: usize,
    vectors: RwLock<AHashMap<String, Vec<f32>>>,
}

impl PrecomputedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: RwLock::new(AHashMap::new()),
        }
    }

    /// Register the vector for a text. The vector is normalized on insert.
    pub fn insert(&self, text: impl Into<String>, mut vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(WikiSearchError::encoding(format!(
                "vector dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        if !l2_normalize(&mut vector) {
            return Err(WikiSearchError::encoding(
                "cannot normalize a zero or non-finite vector",
            ));
        }
        self.vectors.write().insert(text.into(), vector);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }
}

impl Embedder for PrecomputedEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors.read().get(text).cloned().ok_or_else(|| {
            WikiSearchError::encoding(format!("no precomputed vector for text: {text:?}"))
        })
    }
}
