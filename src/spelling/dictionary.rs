//! The spell dictionary: a word list ordered by corpus frequency.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ahash::AHashMap;

use crate::config::SpellConfig;
use crate::error::{Result, WikiSearchError};

/// Maximum edit distance a suggestion may be from the misspelled token.
const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Known words with their corpus-frequency ranks (rank 0 = most frequent).
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    ranks: AHashMap<String, usize>,
    words: Vec<String>,
}

impl Dictionary {
    /// Build from words already ordered by descending corpus frequency.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dictionary = Dictionary::default();
        for word in words {
            dictionary.push(word.as_ref());
        }
        dictionary
    }

    /// Read one word per line, most frequent first. A first line holding
    /// only a number is treated as the word count header some dictionary
    /// exports carry, and skipped.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut dictionary = Dictionary::default();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            if line_no == 0 && word.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            dictionary.push(word);
        }
        Ok(dictionary)
    }

    /// Load the main word list and merge the custom dictionary after it.
    pub fn open(config: &SpellConfig) -> Result<Self> {
        let mut dictionary = Self::from_reader(open_file(&config.dic_path)?)?;
        if let Some(custom_path) = &config.custom_dict_path {
            let custom = Self::from_reader(open_file(custom_path)?)?;
            for word in &custom.words {
                dictionary.push(word);
            }
        }
        Ok(dictionary)
    }

    fn push(&mut self, word: &str) {
        let word = word.to_lowercase();
        if word.is_empty() || self.ranks.contains_key(&word) {
            return;
        }
        self.ranks.insert(word.clone(), self.words.len());
        self.words.push(word);
    }

    pub fn contains(&self, token: &str) -> bool {
        self.ranks.contains_key(&token.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Ranked correction candidates for `token`: dictionary words within
    /// edit distance 2, closest first, corpus rank breaking ties.
    pub fn suggestions(&self, token: &str, max: usize) -> Vec<String> {
        if max == 0 {
            return Vec::new();
        }
        let token = token.to_lowercase();
        let token_len = token.chars().count();

        let mut candidates: Vec<(usize, usize, &String)> = Vec::new();
        for (rank, word) in self.words.iter().enumerate() {
            let word_len = word.chars().count();
            if word_len.abs_diff(token_len) > MAX_SUGGESTION_DISTANCE {
                continue;
            }
            let distance = edit_distance(&token, word);
            if distance > 0 && distance <= MAX_SUGGESTION_DISTANCE {
                candidates.push((distance, rank, word));
            }
        }

        candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        candidates
            .into_iter()
            .take(max)
            .map(|(_, _, word)| word.clone())
            .collect()
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        WikiSearchError::resource(format!("cannot open dictionary {}: {e}", path.display()))
    })
}

/// Optimal string alignment distance: insertions, deletions, substitutions
/// and adjacent transpositions each cost one.
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let width = b.len() + 1;
    let mut table = vec![0usize; (a.len() + 1) * width];
    for i in 0..=a.len() {
        table[i * width] = i;
    }
    for j in 0..=b.len() {
        table[j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution_cost = usize::from(a[i - 1] != b[j - 1]);
            let mut cost = (table[(i - 1) * width + j] + 1)
                .min(table[i * width + j - 1] + 1)
                .min(table[(i - 1) * width + j - 1] + substitution_cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                cost = cost.min(table[(i - 2) * width + j - 2] + 1);
            }
            table[i * width + j] = cost;
        }
    }
    table[a.len() * width + b.len()]
}
