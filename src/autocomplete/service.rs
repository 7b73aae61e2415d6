//! The autocomplete service.

use ahash::AHashSet;

use crate::autocomplete::trie::{CompletionTrie, NextWordTrie};
use crate::config::AutocompleteConfig;
use crate::error::Result;

/// Suggests word completions and next words for a partial query.
///
/// Both tries are loaded once at startup and never change afterwards, so
/// the service is freely shared across request handlers.
pub struct Autocompleter {
    completions: CompletionTrie,
    next_words: NextWordTrie,
    num_suggestions: usize,
}

impl Autocompleter {
    pub fn new(
        completions: CompletionTrie,
        next_words: NextWordTrie,
        num_suggestions: usize,
    ) -> Self {
        Self {
            completions,
            next_words,
            num_suggestions: num_suggestions.max(1),
        }
    }

    /// Load both tries from the configured paths. Missing files are fatal.
    pub fn open(config: &AutocompleteConfig) -> Result<Self> {
        Ok(Self::new(
            CompletionTrie::open(&config.completion_trie_path)?,
            NextWordTrie::open(&config.next_word_trie_path)?,
            config.num_suggestions,
        ))
    }

    /// Up to `num_suggestions` suggestions for the user's partial input.
    ///
    /// Input ending in whitespace asks for the next word; otherwise the
    /// last token is completed, topped up with next-word suggestions when
    /// the vocabulary runs dry.
    pub fn suggest(&self, input: &str) -> Vec<String> {
        let input = input.to_lowercase();
        if input.trim().is_empty() {
            return Vec::new();
        }

        if input.ends_with(char::is_whitespace) {
            self.suggest_next_words(input.trim_end(), self.num_suggestions)
        } else {
            self.suggest_word_completions(&input)
        }
    }

    fn suggest_word_completions(&self, input: &str) -> Vec<String> {
        let prefix = input.split_whitespace().last().unwrap_or(input);
        let mut suggestions = self.completions.completions(prefix, self.num_suggestions);

        if suggestions.len() < self.num_suggestions {
            let remaining = self.num_suggestions - suggestions.len();
            suggestions.extend(self.suggest_next_words(input, remaining));
        }

        dedup_first_seen(suggestions, self.num_suggestions)
    }

    /// Continuations for the phrase so far: each suffix of the input, from
    /// longest to shortest, is tried as a prefix of the next-word trie.
    fn suggest_next_words(&self, input: &str, limit: usize) -> Vec<String> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let mut suggestions = Vec::new();

        for start in 0..parts.len() {
            let mut prefix = parts[start..].join(" ");
            prefix.push(' ');
            for (bigram, _) in self.next_words.entries_with_prefix(&prefix) {
                let continuation = &bigram[prefix.len()..];
                if !continuation.is_empty() {
                    suggestions.push(continuation.to_string());
                }
            }
            if suggestions.len() >= limit {
                break;
            }
        }

        dedup_first_seen(suggestions, limit)
    }
}

fn dedup_first_seen(suggestions: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut unique = Vec::with_capacity(suggestions.len().min(limit));
    for suggestion in suggestions {
        if unique.len() >= limit {
            break;
        }
        if seen.insert(suggestion.clone()) {
            unique.push(suggestion);
        }
    }
    unique
}
