//! Query-side BM25 scoring.

use std::cmp::Ordering;

use ahash::AHashMap;
use log::debug;

use crate::config::Bm25Params;
use crate::error::Result;
use crate::store::relational::{Field, RelationalStore};

const FIELDS: [Field; 2] = [Field::Title, Field::Body];

/// Score candidate documents for the query lemmas with per-field BM25 and
/// sum the field contributions.
pub(crate) fn search(
    store: &dyn RelationalStore,
    params: Bm25Params,
    lemmas: &[String],
    limit: usize,
    offset: usize,
) -> Result<Vec<(u64, f64)>> {
    let resolved = store.lemma_ids(lemmas)?;
    if resolved.is_empty() {
        debug!("no query lemma is known to the index");
        return Ok(Vec::new());
    }
    let lemma_ids: Vec<u64> = {
        let mut ids: Vec<u64> = resolved.values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    };

    let rows = store.term_frequencies(&lemma_ids)?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    // doc_id -> (field, lemma_id) -> frequency
    let mut candidates: AHashMap<u64, AHashMap<(Field, u64), u64>> = AHashMap::new();
    for row in rows {
        candidates
            .entry(row.doc_id)
            .or_default()
            .insert((row.field, row.lemma_id), row.frequency);
    }

    let doc_count = store.document_count()? as f64;
    let mut avg_len = AHashMap::new();
    let mut idf = AHashMap::new();
    for field in FIELDS {
        avg_len.insert(field, store.average_field_length(field)?);
        for lemma_id in &lemma_ids {
            let df = store.document_frequency(field, *lemma_id)? as f64;
            if df > 0.0 {
                let value = ((doc_count - df + 0.5) / (df + 0.5)).ln();
                idf.insert((field, *lemma_id), value);
            }
        }
    }

    let mut scores: Vec<(u64, f64)> = Vec::with_capacity(candidates.len());
    for (doc_id, freqs) in candidates {
        let mut score = 0.0;
        for field in FIELDS {
            let avg = avg_len[&field];
            if avg <= 0.0 {
                continue;
            }
            let field_len = store.field_length(field, doc_id)? as f64;
            for lemma_id in &lemma_ids {
                let tf = freqs.get(&(field, *lemma_id)).copied().unwrap_or(0) as f64;
                if tf <= 0.0 {
                    continue;
                }
                let Some(idf_value) = idf.get(&(field, *lemma_id)) else {
                    continue;
                };
                let tf_component = (tf * (params.k1 + 1.0))
                    / (tf + params.k1 * (1.0 - params.b + params.b * field_len / avg));
                score += idf_value * tf_component;
            }
        }
        scores.push((doc_id, score));
    }

    // Descending by score, ties broken by ascending doc id for
    // reproducible orderings.
    scores.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    Ok(scores.into_iter().skip(offset).take(limit).collect())
}
