//! The analyzer: tokenization, stopword removal, lemmatization.

use std::collections::HashMap;
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::lemmatizer::{IdentityLemmatizer, Lemmatizer};
use crate::analysis::stopwords::StopwordSet;

/// Sentence terminators retained by [`Analyzer::tokenize_with_positions`].
///
/// They consume positions so that bigrams never span a sentence boundary.
const SENTENCE_TERMINATORS: [&str; 4] = [".", "!", "?", "-"];

/// Case handling for the analyzer.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    pub lowercase: bool,
    /// Keep the original casing of named entities even when `lowercase` is
    /// set. Entity recognition is delegated to the lemmatizer.
    pub preserve_ner_case: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            preserve_ner_case: false,
        }
    }
}

/// The text analysis pipeline.
///
/// Produces lemma streams for indexing and querying, surface-to-lemma maps
/// for the word/lemma tables, and position-preserving token streams for
/// postings.
pub struct Analyzer {
    config: AnalyzerConfig,
    stopwords: StopwordSet,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("stopwords", &self.stopwords.len())
            .finish()
    }
}

impl Analyzer {
    pub fn new(
        config: AnalyzerConfig,
        stopwords: StopwordSet,
        lemmatizer: Arc<dyn Lemmatizer>,
    ) -> Self {
        Self {
            config,
            stopwords,
            lemmatizer,
        }
    }

    /// A lowercasing analyzer with no stopwords and identity lemmatization.
    pub fn standard() -> Self {
        Self::new(
            AnalyzerConfig::default(),
            StopwordSet::empty(),
            Arc::new(IdentityLemmatizer),
        )
    }

    /// Tokenize into lemmas, dropping stopwords and punctuation.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        self.analyze(text, |_, lemma| tokens.push(lemma));
        tokens
    }

    /// Tokenize into lemmas and return the surface-to-lemma map of every
    /// retained token.
    pub fn process(&self, text: &str) -> (Vec<String>, HashMap<String, String>) {
        let mut tokens = Vec::new();
        let mut surface_to_lemma = HashMap::new();
        self.analyze(text, |surface, lemma| {
            surface_to_lemma.insert(surface.to_string(), lemma.clone());
            tokens.push(lemma);
        });
        (tokens, surface_to_lemma)
    }

    /// Tokenize preserving order and positions: every non-punctuation token
    /// plus the sentence terminators `.` `!` `?` `-`, all lowercased.
    ///
    /// Stopwords are kept; this stream feeds postings and bigram extraction,
    /// where position density matters more than signal.
    pub fn tokenize_with_positions(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for piece in text.split_word_bounds() {
            if piece.chars().all(char::is_whitespace) {
                continue;
            }
            if SENTENCE_TERMINATORS.contains(&piece) {
                tokens.push(piece.to_string());
                continue;
            }
            if piece.chars().all(|c| !c.is_alphanumeric()) {
                continue;
            }
            tokens.push(normalize(piece).to_lowercase());
        }
        tokens
    }

    fn analyze(&self, text: &str, mut emit: impl FnMut(&str, String)) {
        for word in text.unicode_words() {
            let surface = normalize(word);
            if self.stopwords.contains(&surface) {
                continue;
            }
            let token = if !self.config.lowercase {
                surface.clone()
            } else if self.config.preserve_ner_case && self.lemmatizer.is_entity(&surface) {
                surface.clone()
            } else {
                self.lemmatizer.lemma(&surface)
            };
            if token.is_empty() {
                continue;
            }
            emit(&surface, token);
        }
    }
}

fn normalize(token: &str) -> String {
    token.nfc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lemmatizer::DictionaryLemmatizer;

    fn analyzer_with(
        config: AnalyzerConfig,
        stopwords: &[&str],
        lemmatizer: Arc<dyn Lemmatizer>,
    ) -> Analyzer {
        Analyzer::new(config, StopwordSet::from_words(stopwords), lemmatizer)
    }

    #[test]
    fn test_tokenize_drops_stopwords_and_punctuation() {
        let analyzer = analyzer_with(
            AnalyzerConfig::default(),
            &["is", "the", "of"],
            Arc::new(IdentityLemmatizer),
        );
        let tokens = analyzer.tokenize("Sofia is the capital of Bulgaria.");
        assert_eq!(tokens, vec!["sofia", "capital", "bulgaria"]);
    }

    #[test]
    fn test_tokenize_applies_lemmatization() {
        let lemmatizer = DictionaryLemmatizer::from_pairs([("cities", "city")]);
        let analyzer = analyzer_with(AnalyzerConfig::default(), &[], Arc::new(lemmatizer));
        assert_eq!(analyzer.tokenize("ancient Cities"), vec!["ancient", "city"]);
    }

    #[test]
    fn test_preserve_ner_case() {
        let lemmatizer =
            DictionaryLemmatizer::from_pairs([("sofia", "sofia")]).with_entities(["Sofia"]);
        let analyzer = analyzer_with(
            AnalyzerConfig {
                lowercase: true,
                preserve_ner_case: true,
            },
            &[],
            Arc::new(lemmatizer),
        );
        assert_eq!(analyzer.tokenize("Sofia rising"), vec!["Sofia", "rising"]);
    }

    #[test]
    fn test_no_lowercase_keeps_surfaces() {
        let analyzer = analyzer_with(
            AnalyzerConfig {
                lowercase: false,
                preserve_ner_case: false,
            },
            &[],
            Arc::new(IdentityLemmatizer),
        );
        assert_eq!(analyzer.tokenize("Plovdiv City"), vec!["Plovdiv", "City"]);
    }

    #[test]
    fn test_process_returns_surface_map() {
        let analyzer = analyzer_with(
            AnalyzerConfig::default(),
            &["is"],
            Arc::new(IdentityLemmatizer),
        );
        let (tokens, map) = analyzer.process("Plovdiv is Ancient");
        assert_eq!(tokens, vec!["plovdiv", "ancient"]);
        assert_eq!(map.get("Plovdiv").map(String::as_str), Some("plovdiv"));
        assert_eq!(map.get("Ancient").map(String::as_str), Some("ancient"));
        assert!(!map.contains_key("is"));
    }

    #[test]
    fn test_positions_keep_terminators_and_stopwords() {
        let analyzer = analyzer_with(
            AnalyzerConfig::default(),
            &["is", "an"],
            Arc::new(IdentityLemmatizer),
        );
        let tokens = analyzer.tokenize_with_positions("Plovdiv is an ancient city. Old!");
        assert_eq!(
            tokens,
            vec!["plovdiv", "is", "an", "ancient", "city", ".", "old", "!"]
        );
    }

    #[test]
    fn test_positions_skip_other_punctuation() {
        let analyzer = Analyzer::standard();
        let tokens = analyzer.tokenize_with_positions("one, two; three");
        assert_eq!(tokens, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_empty_input() {
        let analyzer = Analyzer::standard();
        assert!(analyzer.tokenize("").is_empty());
        assert!(analyzer.tokenize("   \n\t").is_empty());
        assert!(analyzer.tokenize_with_positions("").is_empty());
    }
}
