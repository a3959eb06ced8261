//! Shared state synchronizer
//!
//! ## 責務
//!
//! - ローカルの状態変更をストアへマージパッチとして書き込む
//! - ドキュメントが存在しない場合はパッチとローカル状態から再作成する
//! - ドキュメントの購読を [`DocumentFeed`] として提供し、各更新を分類する
//! - 購読でドキュメントが無いと分かった場合に初期状態で作成する
//!
//! ストアのエラーはここで通知に変換され、呼び出し側は [`SyncOutcome`] だけを見る。

use std::sync::Arc;

use crate::domain::{
    DocumentChange, DocumentSeed, DocumentTracker, Notice, Notifier, PairingKey,
    ParticipantId, RemoteStore, SharedSessionDocument, StatePatch, StoreError, Subscription,
    TimerState,
};

const SYNC_ERROR: &str = "Sync Error";

/// Who writes to which document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    pub key: PairingKey,
    pub self_id: ParticipantId,
}

/// Result of [`Synchronizer::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Patched,
    /// The document was missing and has been re-created from the local state
    Reinitialized,
    Failed,
}

/// Event produced by a [`DocumentFeed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Change(DocumentChange),
    /// The document is absent; the listener seeds it with
    /// [`Synchronizer::initialize`]
    Missing,
}

#[derive(Clone)]
pub struct Synchronizer {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Write `patch` (plus `lastWriter`) to the shared document
    pub async fn push(
        &self,
        context: &SyncContext,
        patch: StatePatch,
        local: &TimerState,
    ) -> SyncOutcome {
        let error = match self
            .store
            .patch_document(&context.key, patch.clone(), &context.self_id)
            .await
        {
            Ok(()) => return SyncOutcome::Patched,
            Err(error) => error,
        };

        let missing = match &error {
            StoreError::NotFound(_) => true,
            _ => matches!(self.store.get_document(&context.key).await, Ok(None)),
        };
        if missing {
            tracing::warn!(
                "Shared document '{}' not found on update, re-initializing: {}",
                context.key,
                error
            );
            return self.reinitialize(context, patch, local).await;
        }

        tracing::warn!("Failed to update shared document '{}': {}", context.key, error);
        self.notify_failure("Our actions couldn't be synced.");
        SyncOutcome::Failed
    }

    async fn reinitialize(
        &self,
        context: &SyncContext,
        patch: StatePatch,
        local: &TimerState,
    ) -> SyncOutcome {
        let seed = patch.complete_with(local, &context.self_id);
        match self.store.create_document(&context.key, seed).await {
            Ok(true) => SyncOutcome::Reinitialized,
            Ok(false) => {
                // 別のクライアントが先に作成したので、パッチを一度だけ再適用する
                tracing::debug!("Document '{}' reappeared, re-applying patch", context.key);
                match self
                    .store
                    .patch_document(&context.key, patch, &context.self_id)
                    .await
                {
                    Ok(()) => SyncOutcome::Patched,
                    Err(e) => {
                        tracing::warn!("Re-applied patch failed for '{}': {}", context.key, e);
                        self.notify_failure("Our actions couldn't be synced.");
                        SyncOutcome::Failed
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to re-initialize '{}': {}", context.key, e);
                self.notify_failure("Failed to re-sync our session.");
                SyncOutcome::Failed
            }
        }
    }

    /// Create the shared document from `seed` unless it exists.
    ///
    /// Returns `true` if this call created it.
    pub async fn initialize(&self, context: &SyncContext, seed: DocumentSeed) -> bool {
        match self.store.create_document(&context.key, seed).await {
            Ok(true) => {
                tracing::info!("Created shared document '{}'", context.key);
                true
            }
            Ok(false) => {
                tracing::debug!("Shared document '{}' was created by the partner", context.key);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to create shared document '{}': {}", context.key, e);
                self.notify_failure("Could not initialize our shared session.");
                false
            }
        }
    }

    /// Subscribe to the shared document of `context`.
    ///
    /// Returns `None` (after notifying) if the subscription cannot be opened.
    pub async fn attach(&self, context: SyncContext) -> Option<DocumentFeed> {
        match self.store.subscribe_document(&context.key).await {
            Ok(subscription) => {
                tracing::info!("Listening to shared document '{}'", context.key);
                Some(DocumentFeed {
                    subscription,
                    tracker: DocumentTracker::new(context.self_id.clone()),
                    context,
                })
            }
            Err(e) => {
                tracing::warn!("Failed to subscribe to '{}': {}", context.key, e);
                self.notify_failure("Could not connect to our shared session.");
                None
            }
        }
    }

    fn notify_failure(&self, description: &str) {
        self.notifier
            .notify(Notice::destructive(SYNC_ERROR, description));
    }
}

/// Live, classified view of one shared document. Dropping it detaches.
pub struct DocumentFeed {
    subscription: Subscription<Option<SharedSessionDocument>>,
    tracker: DocumentTracker,
    context: SyncContext,
}

impl DocumentFeed {
    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Next classified event; `None` once the subscription has ended
    pub async fn next(&mut self) -> Option<SyncEvent> {
        match self.subscription.next().await? {
            Some(document) => Some(SyncEvent::Change(self.tracker.observe(document))),
            None => {
                self.tracker.observe_missing();
                Some(SyncEvent::Missing)
            }
        }
    }
}
