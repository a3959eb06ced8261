//! UseCase: ドキュメントの取得

use std::sync::Arc;

use crate::domain::{DocumentKey, SessionDocument, SessionDocumentRepository};

/// ドキュメント取得のユースケース
pub struct GetDocumentUseCase {
    repository: Arc<dyn SessionDocumentRepository>,
}

impl GetDocumentUseCase {
    pub fn new(repository: Arc<dyn SessionDocumentRepository>) -> Self {
        Self { repository }
    }

    /// 存在しない場合は `None`
    pub async fn execute(&self, key: &DocumentKey) -> Option<SessionDocument> {
        self.repository.get(key).await
    }
}
