//! Remote store trait
//!
//! ## 責務
//!
//! - 共有ドキュメントの作成・パッチ・取得
//! - セグメントログの追記
//! - ドキュメント / ログの継続購読
//!
//! ストアはドキュメントの更新を書き込み順に配信し、書き込みタイムスタンプを採番します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    DocumentSeed, NewSegmentRecord, PairingKey, ParticipantId, SegmentLogRecord,
    SharedSessionDocument, StatePatch, StoreError,
};

/// Live subscription; dropping it cancels the subscription at the store
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> Subscription<T> {
    pub fn new(receiver: mpsc::UnboundedReceiver<T>) -> Self {
        Self {
            receiver,
            on_cancel: None,
        }
    }

    /// Run `on_cancel` when the subscription is dropped
    pub fn with_cancel(mut self, on_cancel: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(on_cancel));
        self
    }

    /// Next update; `None` once the store side has gone away
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create the document unless one exists; `Ok(true)` if this call created it
    async fn create_document(&self, key: &PairingKey, seed: DocumentSeed)
    -> Result<bool, StoreError>;

    /// Shallow merge into an existing document (`StoreError::NotFound` if absent)
    async fn patch_document(
        &self,
        key: &PairingKey,
        patch: StatePatch,
        writer: &ParticipantId,
    ) -> Result<(), StoreError>;

    async fn get_document(&self, key: &PairingKey)
    -> Result<Option<SharedSessionDocument>, StoreError>;

    /// Append a log record; returns the store-assigned id
    async fn append_record(&self, record: NewSegmentRecord) -> Result<String, StoreError>;

    /// Current snapshot first, then every change (`None` = absent)
    async fn subscribe_document(
        &self,
        key: &PairingKey,
    ) -> Result<Subscription<Option<SharedSessionDocument>>, StoreError>;

    /// Full record list of a key, newest first, on subscribe and after every append
    async fn subscribe_records(
        &self,
        key: &PairingKey,
    ) -> Result<Subscription<Vec<SegmentLogRecord>>, StoreError>;
}
