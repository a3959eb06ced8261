//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{NotifyError, RepositoryError};

/// ドキュメント書き込みのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteDocumentError {
    #[error("no document for key '{0}'")]
    NotFound(String),
}

impl From<RepositoryError> for WriteDocumentError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::DocumentNotFound(key) => Self::NotFound(key),
        }
    }
}

/// 購読開始のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("connection is gone: {0}")]
    ConnectionGone(#[from] NotifyError),
}
