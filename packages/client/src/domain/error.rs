//! Domain layer errors.

use thiserror::Error;

/// Rejected user input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("participant identifier must not be empty")]
    EmptyIdentifier,

    #[error("partner identifier must differ from your own")]
    SelfPairing,

    #[error("{field} must be at least 1 minute (got {value})")]
    InvalidDuration { field: &'static str, value: u32 },
}

/// Remote store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no document for key '{0}'")]
    NotFound(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("store connection closed")]
    Closed,
}

/// Device-local preference store failures
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preferences at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}
