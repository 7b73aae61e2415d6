//! Query spell-correction over a fixed dictionary.

pub mod corrector;
pub mod dictionary;

pub use corrector::SpellChecker;
pub use dictionary::Dictionary;
