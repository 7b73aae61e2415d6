//! Prefix and next-word autocomplete over static tries.

pub mod service;
pub mod trie;

pub use service::Autocompleter;
pub use trie::{CompletionTrie, NextWordTrie};
