//! Pluggable lemmatization.
//!
//! The corpus is not bound to one language, so surface-to-lemma mapping is
//! a trait with three provided implementations: a lowercasing identity, a
//! lookup table exported from a morphological model, and a Snowball stemmer
//! for languages where stemming is a good-enough lemma proxy.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use rust_stemmers::{Algorithm, Stemmer};

use crate::error::{Result, WikiSearchError};

/// Maps a surface token to its lemma.
pub trait Lemmatizer: Send + Sync {
    /// The lemma of `token`, lowercased.
    fn lemma(&self, token: &str) -> String;

    /// Whether `token` names an entity whose casing should survive
    /// analysis when the analyzer is configured to preserve it.
    fn is_entity(&self, _token: &str) -> bool {
        false
    }
}

/// Lemma = lowercased surface form.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLemmatizer;

impl Lemmatizer for IdentityLemmatizer {
    fn lemma(&self, token: &str) -> String {
        token.to_lowercase()
    }
}

/// Table-driven lemmatizer.
///
/// The table holds lowercased surface forms mapped to lemmas; tokens
/// without an entry fall back to their lowercased surface. An optional
/// entity set drives case preservation.
#[derive(Debug, Clone, Default)]
pub struct DictionaryLemmatizer {
    table: AHashMap<String, String>,
    entities: AHashSet<String>,
}

impl DictionaryLemmatizer {
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let table = pairs
            .into_iter()
            .map(|(s, l)| (s.as_ref().to_lowercase(), l.as_ref().to_lowercase()))
            .collect();
        Self {
            table,
            entities: AHashSet::new(),
        }
    }

    /// Load tab-separated `surface<TAB>lemma` lines.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut table = AHashMap::new();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((surface, lemma)) = line.split_once('\t') else {
                continue;
            };
            table.insert(surface.to_lowercase(), lemma.trim().to_lowercase());
        }
        Ok(Self {
            table,
            entities: AHashSet::new(),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            WikiSearchError::resource(format!("cannot open lemma table {}: {e}", path.display()))
        })?;
        Self::from_reader(file)
    }

    /// Register entity surface forms whose casing is meaningful.
    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.entities = entities
            .into_iter()
            .map(|e| e.as_ref().to_string())
            .collect();
        self
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Lemmatizer for DictionaryLemmatizer {
    fn lemma(&self, token: &str) -> String {
        let lower = token.to_lowercase();
        match self.table.get(&lower) {
            Some(lemma) => lemma.clone(),
            None => lower,
        }
    }

    fn is_entity(&self, token: &str) -> bool {
        self.entities.contains(token)
    }
}

/// Snowball-stemmer lemmatizer.
pub struct StemLemmatizer {
    stemmer: Stemmer,
}

impl StemLemmatizer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            stemmer: Stemmer::create(algorithm),
        }
    }
}

impl std::fmt::Debug for StemLemmatizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemLemmatizer").finish()
    }
}

impl Lemmatizer for StemLemmatizer {
    fn lemma(&self, token: &str) -> String {
        self.stemmer.stem(&token.to_lowercase()).into_owned()
    }
}
