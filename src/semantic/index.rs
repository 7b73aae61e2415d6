//! The semantic index: chunked-document embeddings in an ANN graph.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{error, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::{AnnIndexConfig, EmbeddingConfig};
use crate::embedding::embedder::{Embedder, l2_normalize};
use crate::embedding::segment::split_text;
use crate::error::{Result, WikiSearchError};
use crate::semantic::hnsw::{HnswConfig, HnswGraph};

/// How per-segment similarities are folded into one document score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreStrategy {
    /// Sum of segment similarities; rewards documents with several
    /// relevant segments.
    #[default]
    Sum,
    /// Mean segment similarity; normalizes for segment count.
    Avg,
    /// Best single segment, reported as its cosine distance (lower is
    /// better).
    Min,
}

impl FromStr for ScoreStrategy {
    type Err = WikiSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(ScoreStrategy::Sum),
            "avg" => Ok(ScoreStrategy::Avg),
            "min" => Ok(ScoreStrategy::Min),
            other => Err(WikiSearchError::input(format!(
                "unknown score strategy: {other:?}"
            ))),
        }
    }
}

/// ANN index of segment vectors with one key per document.
///
/// Load the index once at startup; readers run concurrently behind the
/// interior lock, the single ingest writer takes it exclusively. The index
/// flushes every `save_threshold` document adds and again on drop, each
/// time writing to a temporary file and renaming it into place.
pub struct SemanticIndex {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    max_segment_len: usize,
    save_threshold: usize,
    graph: RwLock<HnswGraph>,
    documents_added: AtomicUsize,
    dirty: AtomicBool,
}

impl SemanticIndex {
    /// Load the index from `config.path`, or create an empty one (and its
    /// file) when none exists.
    pub fn open(
        config: &AnnIndexConfig,
        embedding: &EmbeddingConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if embedder.dimension() != config.dimension {
            return Err(WikiSearchError::input(format!(
                "embedder dimension {} does not match index dimension {}",
                embedder.dimension(),
                config.dimension
            )));
        }
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let existing = config.path.is_file();
        let graph = if existing {
            info!("loading ANN index from {}", config.path.display());
            let bytes = fs::read(&config.path)?;
            HnswGraph::from_bytes(&bytes, config.dimension)?
        } else {
            info!(
                "creating new ANN index with dimension {} at {}",
                config.dimension,
                config.path.display()
            );
            HnswGraph::new(HnswConfig::new(config.dimension))
        };

        let index = Self {
            path: config.path.clone(),
            embedder,
            max_segment_len: embedding.max_segment_len,
            save_threshold: config.save_threshold.max(1),
            graph: RwLock::new(graph),
            documents_added: AtomicUsize::new(0),
            dirty: AtomicBool::new(false),
        };
        if !existing {
            index.flush()?;
        }
        Ok(index)
    }

    /// Split `text` into segments, embed them, and add one vector per
    /// segment under `doc_id`.
    pub fn store(&self, doc_id: u64, text: &str) -> Result<()> {
        let segments = split_text(text, self.max_segment_len);
        if segments.is_empty() {
            return Ok(());
        }

        let mut vectors = self.embedder.encode_batch(&segments)?;
        for vector in &mut vectors {
            if !l2_normalize(vector) {
                return Err(WikiSearchError::encoding(format!(
                    "embedder returned a zero or non-finite vector for document {doc_id}"
                )));
            }
        }

        {
            let mut graph = self.graph.write();
            for vector in vectors {
                graph.add(doc_id, vector)?;
            }
        }
        self.dirty.store(true, Ordering::SeqCst);

        let added = self.documents_added.fetch_add(1, Ordering::SeqCst) + 1;
        if added % self.save_threshold == 0 {
            if let Err(e) = self.flush() {
                error!("periodic ANN index flush failed: {e}");
            }
        }
        Ok(())
    }

    /// Rank documents for `query` by aggregated segment similarity.
    ///
    /// The `limit + offset` nearest segment hits are grouped by document
    /// and aggregated per `strategy`; `offset` and `limit` apply after
    /// aggregation.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        strategy: ScoreStrategy,
    ) -> Result<Vec<(u64, f64)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut query_vector = self.embedder.encode(query)?;
        if query_vector.len() != self.embedder.dimension() {
            return Err(WikiSearchError::encoding(format!(
                "embedder returned a vector of dimension {}, expected {}",
                query_vector.len(),
                self.embedder.dimension()
            )));
        }
        if !l2_normalize(&mut query_vector) {
            return Err(WikiSearchError::encoding(
                "embedder returned a zero or non-finite query vector",
            ));
        }

        let segment_hits = self.graph.read().search(&query_vector, limit + offset)?;
        let mut ranked = aggregate(&segment_hits, strategy);
        Ok(ranked.drain(..).skip(offset).take(limit).collect())
    }

    /// Number of stored segment vectors.
    pub fn segment_count(&self) -> usize {
        self.graph.read().len()
    }

    /// Persist the index atomically: write a temporary file next to the
    /// target and rename it into place.
    pub fn flush(&self) -> Result<()> {
        let bytes = self.graph.read().to_bytes()?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => std::path::Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&self.path)
            .map_err(|e| WikiSearchError::store(format!("cannot replace ANN index file: {e}")))?;
        self.dirty.store(false, Ordering::SeqCst);
        info!("saved ANN index to {}", self.path.display());
        Ok(())
    }
}

impl Drop for SemanticIndex {
    fn drop(&mut self) {
        if self.dirty.load(Ordering::SeqCst)
            && let Err(e) = self.flush()
        {
            error!("final ANN index flush failed: {e}");
        }
    }
}

fn aggregate(segment_hits: &[(u64, f32)], strategy: ScoreStrategy) -> Vec<(u64, f64)> {
    let mut per_doc: Vec<(u64, Vec<f64>)> = Vec::new();
    for (doc_id, distance) in segment_hits {
        match per_doc.iter_mut().find(|(id, _)| id == doc_id) {
            Some((_, distances)) => distances.push(*distance as f64),
            None => per_doc.push((*doc_id, vec![*distance as f64])),
        }
    }

    let mut ranked: Vec<(u64, f64)> = per_doc
        .into_iter()
        .map(|(doc_id, distances)| {
            let score = match strategy {
                ScoreStrategy::Sum => distances.iter().map(|d| 1.0 - d).sum(),
                ScoreStrategy::Avg => {
                    distances.iter().map(|d| 1.0 - d).sum::<f64>() / distances.len() as f64
                }
                ScoreStrategy::Min => distances.iter().copied().fold(f64::INFINITY, f64::min),
            };
            (doc_id, score)
        })
        .collect();

    match strategy {
        // Higher aggregated similarity first.
        ScoreStrategy::Sum | ScoreStrategy::Avg => ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        }),
        // Lower best-segment distance first.
        ScoreStrategy::Min => ranked.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        }),
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::PrecomputedEmbedder;
    use tempfile::TempDir;

    const DIMENSION: usize = 4;

    fn axis(index: usize, weight: f32) -> Vec<f32> {
        let mut v = vec![0.0; DIMENSION];
        v[index] = weight;
        // A second small component keeps similarities positive.
        v[(index + 1) % DIMENSION] = 0.1;
        v
    }

    fn embedder() -> Arc<PrecomputedEmbedder> {
        let embedder = PrecomputedEmbedder::new(DIMENSION);
        embedder.insert("alpha topic", axis(0, 1.0)).unwrap();
        embedder.insert("alpha details", axis(0, 0.9)).unwrap();
        embedder.insert("beta topic", axis(2, 1.0)).unwrap();
        embedder.insert("alpha", axis(0, 1.0)).unwrap();
        Arc::new(embedder)
    }

    fn open_index(dir: &TempDir, embedder: Arc<PrecomputedEmbedder>) -> SemanticIndex {
        let config = AnnIndexConfig {
            path: dir.path().join("semantic.index"),
            dimension: DIMENSION,
            save_threshold: 10,
        };
        SemanticIndex::open(&config, &EmbeddingConfig::default(), embedder).unwrap()
    }

    #[test]
    fn test_store_splits_into_segments() {
        let dir = TempDir::new().unwrap();
        let embedder = PrecomputedEmbedder::new(DIMENSION);
        embedder.insert("first segment text", axis(0, 1.0)).unwrap();
        embedder.insert("second segment text", axis(1, 1.0)).unwrap();

        let config = AnnIndexConfig {
            path: dir.path().join("small.index"),
            dimension: DIMENSION,
            save_threshold: 10,
        };
        // Under a small segment limit the two sentences embed separately.
        let index = SemanticIndex::open(
            &config,
            &EmbeddingConfig {
                max_segment_len: 20,
            },
            Arc::new(embedder),
        )
        .unwrap();
        index
            .store(1, "first segment text. second segment text")
            .unwrap();
        assert_eq!(index.segment_count(), 2);
    }

    #[test]
    fn test_stored_vectors_are_unit_norm() {
        let dir = TempDir::new().unwrap();
        let embedder = PrecomputedEmbedder::new(DIMENSION);
        embedder.insert("alpha topic", axis(0, 3.0)).unwrap();
        let index = open_index(&dir, Arc::new(embedder));
        index.store(1, "alpha topic").unwrap();

        let graph = index.graph.read();
        for vector in graph.vectors() {
            let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_aggregation_properties() {
        let hits = vec![(1, 0.1f32), (1, 0.3), (2, 0.2)];

        let sum = aggregate(&hits, ScoreStrategy::Sum);
        let avg = aggregate(&hits, ScoreStrategy::Avg);
        let min = aggregate(&hits, ScoreStrategy::Min);

        let sum_1 = sum.iter().find(|(d, _)| *d == 1).unwrap().1;
        let avg_1 = avg.iter().find(|(d, _)| *d == 1).unwrap().1;
        let min_1 = min.iter().find(|(d, _)| *d == 1).unwrap().1;

        assert!((sum_1 - 1.6).abs() < 1e-9);
        assert!((avg_1 - 0.8).abs() < 1e-9);
        assert!((min_1 - 0.1).abs() < 1e-9);

        assert!(avg_1 >= 0.0 && avg_1 <= 1.0);
        assert!(sum_1 >= avg_1);
        assert!(min_1 >= 0.0 && min_1 <= 2.0);

        // Min ranks ascending by distance.
        assert_eq!(min[0].0, 1);
    }

    #[test]
    fn test_sum_rewards_multi_segment_documents() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, embedder());
        index.store(1, "alpha topic").unwrap();
        index.store(1, "alpha details").unwrap();
        index.store(2, "beta topic").unwrap();

        let hits = index.search("alpha", 10, 0, ScoreStrategy::Sum).unwrap();
        assert_eq!(hits[0].0, 1);
        assert!(hits[0].1 > 1.0, "two close segments should sum above 1");
    }

    #[test]
    fn test_offset_applies_after_aggregation() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, embedder());
        index.store(1, "alpha topic").unwrap();
        index.store(2, "beta topic").unwrap();

        let all = index.search("alpha", 10, 0, ScoreStrategy::Avg).unwrap();
        assert_eq!(all.len(), 2);
        let tail = index.search("alpha", 10, 1, ScoreStrategy::Avg).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].0, all[1].0);
    }

    #[test]
    fn test_flush_and_reload() {
        let dir = TempDir::new().unwrap();
        let config = AnnIndexConfig {
            path: dir.path().join("semantic.index"),
            dimension: DIMENSION,
            save_threshold: 10,
        };
        {
            let index =
                SemanticIndex::open(&config, &EmbeddingConfig::default(), embedder()).unwrap();
            index.store(1, "alpha topic").unwrap();
            index.flush().unwrap();
        }

        let reopened =
            SemanticIndex::open(&config, &EmbeddingConfig::default(), embedder()).unwrap();
        assert_eq!(reopened.segment_count(), 1);
        let hits = reopened.search("alpha", 5, 0, ScoreStrategy::Avg).unwrap();
        assert_eq!(hits[0].0, 1);
    }

    #[test]
    fn test_drop_flushes_pending_adds() {
        let dir = TempDir::new().unwrap();
        let config = AnnIndexConfig {
            path: dir.path().join("semantic.index"),
            dimension: DIMENSION,
            // High threshold: only the drop flush can persist the add.
            save_threshold: 1000,
        };
        {
            let index =
                SemanticIndex::open(&config, &EmbeddingConfig::default(), embedder()).unwrap();
            index.store(1, "alpha topic").unwrap();
        }
        let reopened =
            SemanticIndex::open(&config, &EmbeddingConfig::default(), embedder()).unwrap();
        assert_eq!(reopened.segment_count(), 1);
    }

    #[test]
    fn test_unknown_query_is_encoding_error() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, embedder());
        let err = index
            .search("never embedded", 5, 0, ScoreStrategy::Sum)
            .unwrap_err();
        assert!(matches!(err, WikiSearchError::Encoding(_)));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("sum".parse::<ScoreStrategy>().unwrap(), ScoreStrategy::Sum);
        assert_eq!("avg".parse::<ScoreStrategy>().unwrap(), ScoreStrategy::Avg);
        assert_eq!("min".parse::<ScoreStrategy>().unwrap(), ScoreStrategy::Min);
        assert!("best".parse::<ScoreStrategy>().is_err());
    }
}
