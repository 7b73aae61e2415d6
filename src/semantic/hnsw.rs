//! HNSW graph over unit vectors with multi-valued keys.
//!
//! Cosine metric: all stored vectors and queries are unit length, so
//! distance is `1 - dot`. One key (document id) may own any number of
//! nodes, one per embedded segment.
//!
//! The on-disk format is little-endian binary with a trailing CRC32 so a
//! torn or corrupted file is detected at load time instead of producing
//! silently broken search results.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io::Cursor;

use ahash::AHashSet;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, WikiSearchError};

const MAGIC: u32 = 0x5753_4e48;
const FORMAT_VERSION: u32 = 1;
const MAX_LEVEL: usize = 32;

/// Construction and search parameters.
#[derive(Debug, Clone)]
pub struct HnswConfig {
    pub dimension: usize,
    /// Maximum neighbors per node above layer 0; layer 0 allows twice as
    /// many.
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub seed: u64,
}

impl HnswConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            m: 16,
            ef_construction: 100,
            ef_search: 64,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    key: u64,
    vector: Vec<f32>,
    /// Neighbor node ids per layer, `neighbors[0]` being the base layer.
    neighbors: Vec<Vec<u32>>,
}

impl Node {
    fn top_level(&self) -> usize {
        self.neighbors.len() - 1
    }
}

/// A candidate ordered by distance; the `BinaryHeap` default is a max-heap,
/// so the peek is the farthest candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapItem {
    distance: f32,
    node: u32,
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Navigable small-world graph with cosine distance.
pub struct HnswGraph {
    config: HnswConfig,
    nodes: Vec<Node>,
    entry: Option<u32>,
    level_norm: f64,
    rng: StdRng,
}

impl std::fmt::Debug for HnswGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswGraph")
            .field("dimension", &self.config.dimension)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl HnswGraph {
    pub fn new(config: HnswConfig) -> Self {
        let level_norm = 1.0 / (config.m.max(2) as f64).ln();
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            nodes: Vec::new(),
            entry: None,
            level_norm,
            rng,
        }
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Number of stored vectors (not distinct keys).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all stored vectors; used by invariant checks.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.nodes.iter().map(|node| node.vector.as_slice())
    }

    /// Add one vector under `key`. The same key may be added any number of
    /// times. The vector must be unit length; callers normalize.
    pub fn add(&mut self, key: u64, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(WikiSearchError::encoding(format!(
                "vector dimension mismatch: expected {}, got {}",
                self.config.dimension,
                vector.len()
            )));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(WikiSearchError::encoding(
                "vector contains non-finite values",
            ));
        }

        let level = self.sample_level();
        let node_id = self.nodes.len() as u32;
        self.nodes.push(Node {
            key,
            vector,
            neighbors: vec![Vec::new(); level + 1],
        });

        let Some(entry) = self.entry else {
            self.entry = Some(node_id);
            return Ok(());
        };

        let query = self.nodes[node_id as usize].vector.clone();
        let entry_level = self.nodes[entry as usize].top_level();
        let mut entry_points = vec![entry];

        // Greedy descent through the layers above the new node's level.
        for layer in ((level + 1)..=entry_level).rev() {
            let nearest = self.search_layer(&query, &entry_points, 1, layer);
            if let Some(best) = nearest.first() {
                entry_points = vec![best.node];
            }
        }

        // Connect on every shared layer, nearest candidates first. The new
        // node is already in the arena and may be reachable through links
        // made at higher layers, so it is filtered from its own candidates.
        for layer in (0..=level.min(entry_level)).rev() {
            let mut candidates =
                self.search_layer(&query, &entry_points, self.config.ef_construction, layer);
            candidates.retain(|item| item.node != node_id);
            let max_links = self.max_links(layer);
            let selected: Vec<u32> = candidates
                .iter()
                .take(max_links)
                .map(|item| item.node)
                .collect();

            self.nodes[node_id as usize].neighbors[layer] = selected.clone();
            for neighbor in selected {
                self.link(neighbor, node_id, layer);
            }

            entry_points = candidates.iter().map(|item| item.node).collect();
            if entry_points.is_empty() {
                entry_points = vec![entry];
            }
        }

        if level > entry_level {
            self.entry = Some(node_id);
        }
        Ok(())
    }

    /// The `k` nearest stored vectors as `(key, cosine distance)`, distance
    /// ascending. Keys repeat when several segments of one document match.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>> {
        if query.len() != self.config.dimension {
            return Err(WikiSearchError::encoding(format!(
                "query dimension mismatch: expected {}, got {}",
                self.config.dimension,
                query.len()
            )));
        }
        let Some(entry) = self.entry else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let entry_level = self.nodes[entry as usize].top_level();
        let mut entry_points = vec![entry];
        for layer in (1..=entry_level).rev() {
            let nearest = self.search_layer(query, &entry_points, 1, layer);
            if let Some(best) = nearest.first() {
                entry_points = vec![best.node];
            }
        }

        let ef = self.config.ef_search.max(k);
        let mut nearest = self.search_layer(query, &entry_points, ef, 0);
        nearest.truncate(k);
        Ok(nearest
            .into_iter()
            .map(|item| (self.nodes[item.node as usize].key, item.distance))
            .collect())
    }

    /// Beam search within one layer; returns up to `ef` items, distance
    /// ascending.
    fn search_layer(&self, query: &[f32], entry_points: &[u32], ef: usize, layer: usize) -> Vec<HeapItem> {
        let mut visited: AHashSet<u32> = AHashSet::new();
        let mut candidates: BinaryHeap<Reverse<HeapItem>> = BinaryHeap::new();
        let mut results: BinaryHeap<HeapItem> = BinaryHeap::new();

        for &entry in entry_points {
            if !visited.insert(entry) {
                continue;
            }
            let item = HeapItem {
                distance: self.distance(query, entry),
                node: entry,
            };
            candidates.push(Reverse(item));
            results.push(item);
        }

        while let Some(Reverse(current)) = candidates.pop() {
            if let Some(farthest) = results.peek()
                && results.len() >= ef
                && current.distance > farthest.distance
            {
                break;
            }

            let node = &self.nodes[current.node as usize];
            let Some(neighbors) = node.neighbors.get(layer) else {
                continue;
            };
            for &neighbor in neighbors {
                if !visited.insert(neighbor) {
                    continue;
                }
                let distance = self.distance(query, neighbor);
                let farthest = results.peek().map(|item| item.distance);
                if results.len() < ef || farthest.is_some_and(|f| distance < f) {
                    let item = HeapItem {
                        distance,
                        node: neighbor,
                    };
                    candidates.push(Reverse(item));
                    results.push(item);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut sorted = results.into_vec();
        sorted.sort();
        sorted
    }

    /// Add a backlink and prune the neighbor's list to its capacity,
    /// keeping the closest links.
    fn link(&mut self, from: u32, to: u32, layer: usize) {
        let max_links = self.max_links(layer);
        let from_vector = self.nodes[from as usize].vector.clone();

        let list = &mut self.nodes[from as usize].neighbors[layer];
        if list.contains(&to) {
            return;
        }
        list.push(to);
        if list.len() <= max_links {
            return;
        }

        let mut scored: Vec<HeapItem> = self.nodes[from as usize].neighbors[layer]
            .iter()
            .map(|&id| HeapItem {
                distance: cosine_distance(&from_vector, &self.nodes[id as usize].vector),
                node: id,
            })
            .collect();
        scored.sort();
        scored.truncate(max_links);
        self.nodes[from as usize].neighbors[layer] = scored.into_iter().map(|item| item.node).collect();
    }

    fn max_links(&self, layer: usize) -> usize {
        if layer == 0 {
            self.config.m * 2
        } else {
            self.config.m
        }
    }

    fn distance(&self, query: &[f32], node: u32) -> f32 {
        cosine_distance(query, &self.nodes[node as usize].vector)
    }

    fn sample_level(&mut self) -> usize {
        let uniform: f64 = self.rng.random::<f64>().max(f64::MIN_POSITIVE);
        ((-uniform.ln() * self.level_norm) as usize).min(MAX_LEVEL)
    }

    /// Serialize the graph, CRC32-trailed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(64 + self.nodes.len() * (16 + self.config.dimension * 4));
        buffer.write_u32::<LittleEndian>(MAGIC)?;
        buffer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        buffer.write_u32::<LittleEndian>(self.config.dimension as u32)?;
        buffer.write_u32::<LittleEndian>(self.config.m as u32)?;
        buffer.write_u32::<LittleEndian>(self.config.ef_construction as u32)?;
        buffer.write_u32::<LittleEndian>(self.config.ef_search as u32)?;
        buffer.write_u64::<LittleEndian>(self.config.seed)?;
        buffer.write_u32::<LittleEndian>(self.entry.unwrap_or(u32::MAX))?;
        buffer.write_u64::<LittleEndian>(self.nodes.len() as u64)?;

        for node in &self.nodes {
            buffer.write_u64::<LittleEndian>(node.key)?;
            buffer.write_u32::<LittleEndian>(node.neighbors.len() as u32)?;
            for value in &node.vector {
                buffer.write_f32::<LittleEndian>(*value)?;
            }
            for layer in &node.neighbors {
                buffer.write_u32::<LittleEndian>(layer.len() as u32)?;
                for &neighbor in layer {
                    buffer.write_u32::<LittleEndian>(neighbor)?;
                }
            }
        }

        let checksum = crc32fast::hash(&buffer);
        buffer.write_u32::<LittleEndian>(checksum)?;
        Ok(buffer)
    }

    /// Deserialize a graph previously written by [`HnswGraph::to_bytes`].
    pub fn from_bytes(bytes: &[u8], expected_dimension: usize) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(WikiSearchError::store("index file truncated"));
        }
        let (payload, mut tail) = bytes.split_at(bytes.len() - 4);
        let stored_checksum = tail.read_u32::<LittleEndian>()?;
        if crc32fast::hash(payload) != stored_checksum {
            return Err(WikiSearchError::store("index file checksum mismatch"));
        }

        let mut cursor = Cursor::new(payload);
        if cursor.read_u32::<LittleEndian>()? != MAGIC {
            return Err(WikiSearchError::store("not an ANN index file"));
        }
        let version = cursor.read_u32::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(WikiSearchError::store(format!(
                "unsupported index format version {version}"
            )));
        }

        let dimension = cursor.read_u32::<LittleEndian>()? as usize;
        if dimension != expected_dimension {
            return Err(WikiSearchError::store(format!(
                "index dimension {dimension} does not match configured {expected_dimension}"
            )));
        }
        let m = cursor.read_u32::<LittleEndian>()? as usize;
        let ef_construction = cursor.read_u32::<LittleEndian>()? as usize;
        let ef_search = cursor.read_u32::<LittleEndian>()? as usize;
        let seed = cursor.read_u64::<LittleEndian>()?;
        let entry_raw = cursor.read_u32::<LittleEndian>()?;
        let node_count = cursor.read_u64::<LittleEndian>()? as usize;

        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let key = cursor.read_u64::<LittleEndian>()?;
            let level_count = cursor.read_u32::<LittleEndian>()? as usize;
            let mut vector = vec![0f32; dimension];
            for value in vector.iter_mut() {
                *value = cursor.read_f32::<LittleEndian>()?;
            }
            let mut neighbors = Vec::with_capacity(level_count);
            for _ in 0..level_count {
                let link_count = cursor.read_u32::<LittleEndian>()? as usize;
                let mut layer = Vec::with_capacity(link_count);
                for _ in 0..link_count {
                    layer.push(cursor.read_u32::<LittleEndian>()?);
                }
                neighbors.push(layer);
            }
            nodes.push(Node {
                key,
                vector,
                neighbors,
            });
        }

        let config = HnswConfig {
            dimension,
            m,
            ef_construction,
            ef_search,
            seed,
        };
        let level_norm = 1.0 / (config.m.max(2) as f64).ln();
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            nodes,
            entry: (entry_raw != u32::MAX).then_some(entry_raw),
            level_norm,
        })
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    1.0 - dot
}
