//! Semantic retrieval: the ANN index over segment embeddings.

pub mod hnsw;
mod index;

pub use hnsw::{HnswConfig, HnswGraph};
pub use index::{ScoreStrategy, SemanticIndex};
