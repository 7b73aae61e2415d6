//! Text analysis pipeline.
//!
//! Turns raw article text into lemma streams and surface-to-lemma maps.
//! Morphology is language-specific, so the lemmatizer is pluggable.

pub mod analyzer;
pub mod lemmatizer;
pub mod stopwords;

pub use analyzer::{Analyzer, AnalyzerConfig};
pub use lemmatizer::{DictionaryLemmatizer, IdentityLemmatizer, Lemmatizer, StemLemmatizer};
pub use stopwords::StopwordSet;
