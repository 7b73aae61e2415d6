//! Token-level query correction.

use log::debug;

use crate::config::SpellConfig;
use crate::error::Result;
use crate::spelling::dictionary::Dictionary;

/// Dictionary-backed spell checker.
///
/// Corrections replace unknown tokens with the top-ranked suggestion, so
/// the operation preserves token count and order and is idempotent:
/// replacements are themselves dictionary words.
#[derive(Debug, Clone)]
pub struct SpellChecker {
    dictionary: Dictionary,
}

impl SpellChecker {
    pub fn new(dictionary: Dictionary) -> Self {
        Self { dictionary }
    }

    pub fn open(config: &SpellConfig) -> Result<Self> {
        Ok(Self::new(Dictionary::open(config)?))
    }

    /// Correct each whitespace-separated token of `query` independently
    /// and rejoin with single spaces.
    pub fn spellcheck(&self, query: &str) -> String {
        let corrected: Vec<String> = query
            .split_whitespace()
            .map(|token| self.correct_token(token))
            .collect();
        corrected.join(" ")
    }

    fn correct_token(&self, token: &str) -> String {
        if self.dictionary.is_empty() || self.dictionary.contains(token) {
            return token.to_string();
        }
        match self.dictionary.suggestions(token, 1).into_iter().next() {
            Some(suggestion) => {
                debug!("spell-corrected {token:?} to {suggestion:?}");
                suggestion
            }
            None => token.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> SpellChecker {
        SpellChecker::new(Dictionary::from_words(["search", "engine", "sofia"]))
    }

    #[test]
    fn test_corrects_misspelled_token() {
        assert_eq!(checker().spellcheck("serch"), "search");
    }

    #[test]
    fn test_known_tokens_kept() {
        assert_eq!(checker().spellcheck("search engine"), "search engine");
    }

    #[test]
    fn test_token_count_and_order_preserved() {
        let corrected = checker().spellcheck("serch engin sofia");
        assert_eq!(corrected, "search engine sofia");
        assert_eq!(corrected.split(' ').count(), 3);
    }

    #[test]
    fn test_unknown_without_suggestion_kept() {
        assert_eq!(checker().spellcheck("xylophone"), "xylophone");
    }

    #[test]
    fn test_idempotent() {
        let checker = checker();
        for query in ["serch", "search engine", "xylophone serch"] {
            let once = checker.spellcheck(query);
            assert_eq!(checker.spellcheck(&once), once);
        }
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(checker().spellcheck(""), "");
        assert_eq!(checker().spellcheck("   "), "");
    }
}
