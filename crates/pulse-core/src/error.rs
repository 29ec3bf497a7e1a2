//! Error types for the adapter core.
//!
//! Errors propagate with `?` inside the core. The adapter boundary (see [`crate::Adapter`])
//! converts every one of them into a logged, safe default before a caller can see it.

use thiserror::Error;

/// Failures reading or writing the backing key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// The stored bytes exist but do not decode into the expected shape.
    #[error("corrupt value at '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True for malformed persisted data (recoverable with an empty default).
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Failures from the external semantic-similarity service.
#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("semantic request failed: {0}")]
    Request(String),

    #[error("semantic service returned status {0}")]
    Status(u16),

    #[error("semantic service timed out after {0} ms")]
    Timeout(u64),

    #[error("semantic service unavailable")]
    Unavailable,

    #[error("semantic service panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for SemanticError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Request(e.to_string()),
        }
    }
}

/// Failures inside a concrete adapter (reload, transform, respond, search).
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Adapter code panicked; the payload message is kept for the log.
    #[error("adapter code panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}
