//! Embedded relational store.
//!
//! Keeps the whole schema in memory behind one lock. A write-lock scope is
//! the transaction: `ingest_terms` either applies a document completely or
//! not at all. Derived counters (field lengths, distinct-document counts)
//! are maintained on write so BM25 statistics are O(1) reads.

use std::collections::HashMap;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;

use crate::error::{Result, WikiSearchError};
use crate::store::relational::{DocumentMeta, Field, RelationalStore, TermIngest, TfRow};

#[derive(Debug, Default)]
struct FieldTable {
    /// `(lemma_id, doc_id) -> frequency`; a row exists iff frequency > 0.
    tf: AHashMap<(u64, u64), u64>,
    /// `doc_id ->` sum of frequencies in this field.
    doc_len: AHashMap<u64, u64>,
    /// `lemma_id ->` distinct documents containing it in this field.
    term_docs: AHashMap<u64, u64>,
    total_len: u64,
}

impl FieldTable {
    fn add(&mut self, lemma_id: u64, doc_id: u64, frequency: u64) {
        if frequency == 0 {
            return;
        }
        let row = self.tf.entry((lemma_id, doc_id)).or_insert(0);
        if *row == 0 {
            *self.term_docs.entry(lemma_id).or_insert(0) += 1;
        }
        *row += frequency;
        *self.doc_len.entry(doc_id).or_insert(0) += frequency;
        self.total_len += frequency;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PostingRow {
    word_id: u64,
    doc_id: u64,
    position: u64,
}

#[derive(Debug, Default)]
struct Tables {
    documents: AHashMap<u64, DocumentMeta>,
    words: AHashMap<String, u64>,
    /// Lowercased surface -> word id, for resolving position tokens.
    words_ci: AHashMap<String, u64>,
    word_tokens: AHashMap<u64, String>,
    next_word_id: u64,
    lemmas: AHashMap<String, u64>,
    next_lemma_id: u64,
    word_lemma: AHashSet<(u64, u64)>,
    postings: Vec<PostingRow>,
    title: FieldTable,
    body: FieldTable,
}

impl Tables {
    fn upsert_word(&mut self, token: &str) -> u64 {
        if let Some(id) = self.words.get(token) {
            return *id;
        }
        self.next_word_id += 1;
        let id = self.next_word_id;
        self.words.insert(token.to_string(), id);
        self.word_tokens.insert(id, token.to_string());
        self.words_ci.entry(token.to_lowercase()).or_insert(id);
        id
    }

    fn upsert_lemma(&mut self, token: &str) -> u64 {
        if let Some(id) = self.lemmas.get(token) {
            return *id;
        }
        self.next_lemma_id += 1;
        let id = self.next_lemma_id;
        self.lemmas.insert(token.to_string(), id);
        id
    }

    fn field(&self, field: Field) -> &FieldTable {
        match field {
            Field::Title => &self.title,
            Field::Body => &self.body,
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut FieldTable {
        match field {
            Field::Title => &mut self.title,
            Field::Body => &mut self.body,
        }
    }
}

/// In-memory implementation of [`RelationalStore`].
#[derive(Debug, Default)]
pub struct MemoryRelationalStore {
    tables: RwLock<Tables>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelationalStore for MemoryRelationalStore {
    fn insert_document(&self, meta: &DocumentMeta) -> Result<()> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.documents.get(&meta.doc_id)
            && existing != meta
        {
            return Err(WikiSearchError::store(format!(
                "document {} already registered with different metadata",
                meta.doc_id
            )));
        }
        tables.documents.insert(meta.doc_id, meta.clone());
        Ok(())
    }

    fn remove_document(&self, doc_id: u64) -> Result<()> {
        self.tables.write().documents.remove(&doc_id);
        Ok(())
    }

    fn document_meta(&self, doc_id: u64) -> Result<Option<DocumentMeta>> {
        Ok(self.tables.read().documents.get(&doc_id).cloned())
    }

    fn document_count(&self) -> Result<u64> {
        Ok(self.tables.read().documents.len() as u64)
    }

    fn ingest_terms(&self, doc_id: u64, ingest: TermIngest) -> Result<()> {
        let mut tables = self.tables.write();

        for (surface, lemma) in &ingest.word_lemmas {
            let word_id = tables.upsert_word(surface);
            let lemma_id = tables.upsert_lemma(lemma);
            tables.word_lemma.insert((word_id, lemma_id));
        }

        for (field, tf) in [
            (Field::Title, &ingest.title_tf),
            (Field::Body, &ingest.body_tf),
        ] {
            for (lemma_token, frequency) in tf {
                let Some(lemma_id) = tables.lemmas.get(lemma_token).copied() else {
                    continue;
                };
                tables.field_mut(field).add(lemma_id, doc_id, *frequency);
            }
        }

        for (position, token) in ingest.position_tokens.iter().enumerate() {
            let word_id = match tables.words.get(token) {
                Some(id) => Some(*id),
                None => tables.words_ci.get(&token.to_lowercase()).copied(),
            };
            if let Some(word_id) = word_id {
                tables.postings.push(PostingRow {
                    word_id,
                    doc_id,
                    position: position as u64,
                });
            }
        }

        Ok(())
    }

    fn lemma_ids(&self, tokens: &[String]) -> Result<HashMap<String, u64>> {
        let tables = self.tables.read();
        let mut ids = HashMap::new();
        for token in tokens {
            if let Some(id) = tables.lemmas.get(token) {
                ids.insert(token.clone(), *id);
            }
        }
        Ok(ids)
    }

    fn term_frequencies(&self, lemma_ids: &[u64]) -> Result<Vec<TfRow>> {
        let tables = self.tables.read();
        let wanted: AHashSet<u64> = lemma_ids.iter().copied().collect();
        let mut rows = Vec::new();
        for field in [Field::Title, Field::Body] {
            for ((lemma_id, doc_id), frequency) in &tables.field(field).tf {
                if wanted.contains(lemma_id) {
                    rows.push(TfRow {
                        doc_id: *doc_id,
                        lemma_id: *lemma_id,
                        frequency: *frequency,
                        field,
                    });
                }
            }
        }
        Ok(rows)
    }

    fn document_frequency(&self, field: Field, lemma_id: u64) -> Result<u64> {
        Ok(self
            .tables
            .read()
            .field(field)
            .term_docs
            .get(&lemma_id)
            .copied()
            .unwrap_or(0))
    }

    fn field_length(&self, field: Field, doc_id: u64) -> Result<u64> {
        Ok(self
            .tables
            .read()
            .field(field)
            .doc_len
            .get(&doc_id)
            .copied()
            .unwrap_or(0))
    }

    fn average_field_length(&self, field: Field) -> Result<f64> {
        let tables = self.tables.read();
        let table = tables.field(field);
        if table.doc_len.is_empty() {
            return Ok(0.0);
        }
        Ok(table.total_len as f64 / table.doc_len.len() as f64)
    }

    fn vocabulary(&self) -> Result<Vec<String>> {
        let tables = self.tables.read();
        let mut words: Vec<String> = tables
            .words
            .keys()
            .map(|token| token.to_lowercase())
            .collect();
        words.sort();
        words.dedup();
        Ok(words)
    }

    fn word_frequencies(&self) -> Result<Vec<(String, u64)>> {
        let tables = self.tables.read();
        let mut counts: AHashMap<u64, u64> = AHashMap::new();
        for posting in &tables.postings {
            *counts.entry(posting.word_id).or_insert(0) += 1;
        }
        let mut frequencies: Vec<(String, u64)> = counts
            .into_iter()
            .filter_map(|(word_id, count)| {
                tables
                    .word_tokens
                    .get(&word_id)
                    .map(|token| (token.clone(), count))
            })
            .collect();
        frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(frequencies)
    }

    fn bigram_frequencies(&self) -> Result<Vec<(String, u64)>> {
        let tables = self.tables.read();
        let mut by_slot: AHashMap<(u64, u64), u64> = AHashMap::new();
        for posting in &tables.postings {
            by_slot.insert((posting.doc_id, posting.position), posting.word_id);
        }

        let mut counts: AHashMap<String, u64> = AHashMap::new();
        for posting in &tables.postings {
            let Some(next_id) = by_slot.get(&(posting.doc_id, posting.position + 1)) else {
                continue;
            };
            let (Some(w1), Some(w2)) = (
                tables.word_tokens.get(&posting.word_id),
                tables.word_tokens.get(next_id),
            ) else {
                continue;
            };
            let bigram = format!("{} {}", w1.to_lowercase(), w2.to_lowercase());
            *counts.entry(bigram).or_insert(0) += 1;
        }

        let mut bigrams: Vec<(String, u64)> = counts.into_iter().collect();
        bigrams.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(bigrams)
    }
}
