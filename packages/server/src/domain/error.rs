//! Domain layer errors.

use thiserror::Error;

/// Invariant violations detected while building domain values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid document key: {0}")]
    InvalidDocumentKey(String),

    #[error("{field} must be at least 1 (got {value})")]
    InvalidDuration { field: &'static str, value: u32 },

    #[error("lastWriter must not be empty")]
    MissingWriter,
}

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("no document for key '{0}'")]
    DocumentNotFound(String),
}

/// Change notification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("connection {0} is not registered")]
    ConnectionNotFound(u64),

    #[error("failed to push frame: {0}")]
    PushFailed(String),
}
