//! On-disk immutable tries for autocomplete.
//!
//! Both tries are finite-state transducers: the completion trie is a set of
//! vocabulary words enumerated in lexicographic order, the next-word trie
//! maps `"w1 w2"` bigrams to corpus frequencies so enumeration can be
//! re-ranked by frequency.

use std::fs;
use std::path::Path;

use fst::automaton::Str;
use fst::{Automaton, IntoStreamer, Map, MapBuilder, Set, SetBuilder, Streamer};

use crate::error::{Result, WikiSearchError};

/// Prefix-enumerable vocabulary of lowercased surface words.
#[derive(Debug)]
pub struct CompletionTrie {
    set: Set<Vec<u8>>,
}

impl CompletionTrie {
    /// Build from vocabulary words; input order does not matter.
    pub fn build<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        sorted.sort();
        sorted.dedup();

        let mut builder = SetBuilder::memory();
        for word in &sorted {
            builder
                .insert(word)
                .map_err(|e| WikiSearchError::store(format!("completion trie build: {e}")))?;
        }
        let bytes = builder
            .into_inner()
            .map_err(|e| WikiSearchError::store(format!("completion trie build: {e}")))?;
        Set::new(bytes)
            .map(|set| Self { set })
            .map_err(|e| WikiSearchError::store(format!("completion trie build: {e}")))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            WikiSearchError::resource(format!(
                "cannot open completion trie {}: {e}",
                path.display()
            ))
        })?;
        Set::new(bytes).map(|set| Self { set }).map_err(|e| {
            WikiSearchError::store(format!("invalid completion trie {}: {e}", path.display()))
        })
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.set.as_fst().as_bytes())?;
        Ok(())
    }

    /// Up to `limit` vocabulary words starting with `prefix`, in
    /// lexicographic order.
    pub fn completions(&self, prefix: &str, limit: usize) -> Vec<String> {
        let matcher = Str::new(prefix).starts_with();
        let mut stream = self.set.search(matcher).into_stream();
        let mut words = Vec::new();
        while let Some(key) = stream.next() {
            if words.len() >= limit {
                break;
            }
            if let Ok(word) = String::from_utf8(key.to_vec()) {
                words.push(word);
            }
        }
        words
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Bigram trie mapping `"w1 w2"` strings to corpus frequencies.
pub struct NextWordTrie {
    map: Map<Vec<u8>>,
}

impl NextWordTrie {
    /// Build from `(bigram, frequency)` pairs; input order does not matter,
    /// duplicate bigrams keep their highest frequency.
    pub fn build<I, S>(bigrams: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<(String, u64)> = bigrams
            .into_iter()
            .map(|(b, f)| (b.as_ref().to_lowercase(), f))
            .filter(|(b, _)| !b.is_empty())
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
        sorted.dedup_by(|a, b| a.0 == b.0);

        let mut builder = MapBuilder::memory();
        for (bigram, frequency) in &sorted {
            builder
                .insert(bigram, *frequency)
                .map_err(|e| WikiSearchError::store(format!("next-word trie build: {e}")))?;
        }
        let bytes = builder
            .into_inner()
            .map_err(|e| WikiSearchError::store(format!("next-word trie build: {e}")))?;
        Map::new(bytes)
            .map(|map| Self { map })
            .map_err(|e| WikiSearchError::store(format!("next-word trie build: {e}")))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            WikiSearchError::resource(format!(
                "cannot open next-word trie {}: {e}",
                path.display()
            ))
        })?;
        Map::new(bytes).map(|map| Self { map }).map_err(|e| {
            WikiSearchError::store(format!("invalid next-word trie {}: {e}", path.display()))
        })
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.map.as_fst().as_bytes())?;
        Ok(())
    }

    /// All entries starting with `prefix`, most frequent first, ties in
    /// lexicographic order.
    pub fn entries_with_prefix(&self, prefix: &str) -> Vec<(String, u64)> {
        let matcher = Str::new(prefix).starts_with();
        let mut stream = self.map.search(matcher).into_stream();
        let mut entries = Vec::new();
        while let Some((key, frequency)) = stream.next() {
            if let Ok(bigram) = String::from_utf8(key.to_vec()) {
                entries.push((bigram, frequency));
            }
        }
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
