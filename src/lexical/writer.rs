//! Ingest-side term extraction.

use std::collections::HashMap;

use crate::analysis::Analyzer;
use crate::store::relational::TermIngest;

/// Analyze one document into the term data the relational store applies as
/// a single transaction.
pub(crate) fn build_ingest(analyzer: &Analyzer, title: &str, body: &str) -> TermIngest {
    let (title_tokens, title_map) = analyzer.process(title);
    let (body_tokens, body_map) = analyzer.process(body);

    let mut word_lemmas = Vec::with_capacity(title_map.len() + body_map.len());
    word_lemmas.extend(title_map);
    word_lemmas.extend(body_map);

    TermIngest {
        word_lemmas,
        title_tf: count_terms(&title_tokens),
        body_tf: count_terms(&body_tokens),
        position_tokens: analyzer.tokenize_with_positions(body),
    }
}

fn count_terms(tokens: &[String]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}
