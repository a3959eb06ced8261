//! InMemory SessionDocument Repository 実装
//!
//! ドメイン層が定義する SessionDocumentRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    DocumentFields, DocumentKey, DocumentPatch, RepositoryError, SessionDocument,
    SessionDocumentRepository, Timestamp,
};

/// インメモリ SessionDocument Repository 実装
#[derive(Default)]
pub struct InMemorySessionDocumentRepository {
    /// Key: DocumentKey, Value: SessionDocument
    documents: Arc<Mutex<HashMap<DocumentKey, SessionDocument>>>,
}

impl InMemorySessionDocumentRepository {
    /// 新しい InMemorySessionDocumentRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionDocumentRepository for InMemorySessionDocumentRepository {
    async fn get(&self, key: &DocumentKey) -> Option<SessionDocument> {
        let documents = self.documents.lock().await;
        documents.get(key).cloned()
    }

    async fn create_if_absent(
        &self,
        key: DocumentKey,
        fields: DocumentFields,
        written_at: Timestamp,
    ) -> Option<SessionDocument> {
        let mut documents = self.documents.lock().await;
        if documents.contains_key(&key) {
            return None;
        }

        let document = SessionDocument::create(key.clone(), fields, written_at);
        documents.insert(key, document.clone());
        Some(document)
    }

    async fn merge_patch(
        &self,
        key: &DocumentKey,
        patch: DocumentPatch,
        written_at: Timestamp,
    ) -> Result<SessionDocument, RepositoryError> {
        let mut documents = self.documents.lock().await;
        let document = documents
            .get_mut(key)
            .ok_or_else(|| RepositoryError::DocumentNotFound(key.as_str().to_string()))?;

        document.apply_patch(patch, written_at);
        Ok(document.clone())
    }
}
