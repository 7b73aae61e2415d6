//! Stopword filtering.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ahash::AHashSet;

use crate::error::{Result, WikiSearchError};

/// A set of words excluded from lemma streams.
///
/// Membership checks are case-insensitive; words are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct StopwordSet {
    words: AHashSet<String>,
}

impl StopwordSet {
    /// An empty set: nothing is filtered.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Load one word per line; blank lines and `#` comments are skipped.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut words = AHashSet::new();
        for line in BufReader::new(reader).lines() {
            let line = line?;
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') {
                continue;
            }
            words.insert(word.to_lowercase());
        }
        Ok(Self { words })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            WikiSearchError::resource(format!("cannot open stopword list {}: {e}", path.display()))
        })?;
        Self::from_reader(file)
    }

    pub fn contains(&self, token: &str) -> bool {
        if self.words.is_empty() {
            return false;
        }
        self.words.contains(&token.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_membership() {
        let set = StopwordSet::from_words(["The", "of", "И"]);
        assert!(set.contains("the"));
        assert!(set.contains("THE"));
        assert!(set.contains("и"));
        assert!(!set.contains("capital"));
    }

    #[test]
    fn test_reader_skips_comments_and_blanks() {
        let input = "# common words\nthe\n\nof\n";
        let set = StopwordSet::from_reader(input.as_bytes()).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("of"));
    }
}
