//! Error types for the WikiSearch crate.

use thiserror::Error;

/// The crate-wide error type.
///
/// Variants follow the failure taxonomy of the retrieval subsystem: bad
/// caller input, persistent-store failures, missing or exhausted resources,
/// and embedding/decoding failures. Boundaries translate these into the
/// response shape; internal code propagates them with `?`.
#[derive(Error, Debug)]
pub enum WikiSearchError {
    /// Empty or malformed query, unknown index name, invalid parameter.
    #[error("invalid input: {0}")]
    Input(String),

    /// Database, byte-store, or ANN-index read/write failure.
    #[error("store error: {0}")]
    Store(String),

    /// Missing file at startup, exhausted pool, unusable environment.
    #[error("resource error: {0}")]
    Resource(String),

    /// Embedding model unavailable, wrong vector shape, invalid UTF-8.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The request's cancellation signal fired between phases.
    #[error("request cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WikiSearchError {
    pub fn input(msg: impl Into<String>) -> Self {
        WikiSearchError::Input(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        WikiSearchError::Store(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        WikiSearchError::Resource(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        WikiSearchError::Encoding(msg.into())
    }

    /// Whether a query path may degrade this error into an empty result
    /// instead of aborting the request.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            WikiSearchError::Store(_) | WikiSearchError::Encoding(_)
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, WikiSearchError>;
