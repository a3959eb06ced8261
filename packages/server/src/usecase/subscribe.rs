//! UseCase: ドキュメント / セグメントログの購読
//!
//! ## 設計ノート
//!
//! 購読の登録とスナップショットの送信は WriteGate の内側で行います。
//! 書き込みは同じゲートの内側で配信されるため、購読者は
//! 「スナップショット → その後の変更」を欠落も重複もなく受け取ります。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 購読直後にスナップショットが送信されること（未作成なら `None`）
//! - 接続が登録されていない場合はエラーになり、スナップショットも送信されないこと

use std::sync::Arc;

use crate::domain::{
    ChangeNotifier, ConnectionId, DocumentKey, SegmentRecordRepository, SessionDocumentRepository,
    SubscriptionId,
};

use super::{SubscribeError, WriteGate};

/// ドキュメント購読のユースケース
pub struct SubscribeDocumentUseCase {
    repository: Arc<dyn SessionDocumentRepository>,
    notifier: Arc<dyn ChangeNotifier>,
    gate: WriteGate,
}

impl SubscribeDocumentUseCase {
    pub fn new(
        repository: Arc<dyn SessionDocumentRepository>,
        notifier: Arc<dyn ChangeNotifier>,
        gate: WriteGate,
    ) -> Self {
        Self {
            repository,
            notifier,
            gate,
        }
    }

    /// 購読を登録し、現在のスナップショットを送信する
    pub async fn execute(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        key: DocumentKey,
    ) -> Result<(), SubscribeError> {
        let _gate = self.gate.enter().await;
        self.notifier
            .watch_document(connection, subscription, key.clone())
            .await?;

        let snapshot = self.repository.get(&key).await;
        tracing::debug!(
            "Connection {} subscribed to document '{}' (exists: {})",
            connection.value(),
            key.as_str(),
            snapshot.is_some()
        );
        self.notifier
            .push_document(connection, subscription, snapshot)
            .await?;
        Ok(())
    }
}

/// セグメントログ購読のユースケース
pub struct SubscribeRecordsUseCase {
    repository: Arc<dyn SegmentRecordRepository>,
    notifier: Arc<dyn ChangeNotifier>,
    gate: WriteGate,
}

impl SubscribeRecordsUseCase {
    pub fn new(
        repository: Arc<dyn SegmentRecordRepository>,
        notifier: Arc<dyn ChangeNotifier>,
        gate: WriteGate,
    ) -> Self {
        Self {
            repository,
            notifier,
            gate,
        }
    }

    /// 購読を登録し、現在のレコード一覧（降順）を送信する
    pub async fn execute(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        key: DocumentKey,
    ) -> Result<(), SubscribeError> {
        let _gate = self.gate.enter().await;
        self.notifier
            .watch_records(connection, subscription, key.clone())
            .await?;

        let records = self.repository.list_by_key(&key).await;
        self.notifier
            .push_records(connection, subscription, records)
            .await?;
        Ok(())
    }
}

/// 購読解除のユースケース
pub struct UnsubscribeUseCase {
    notifier: Arc<dyn ChangeNotifier>,
}

impl UnsubscribeUseCase {
    pub fn new(notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { notifier }
    }

    /// 存在しない購読の解除も成功扱い
    pub async fn execute(&self, connection: ConnectionId, subscription: SubscriptionId) {
        self.notifier.unwatch(connection, subscription).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            DocumentFields, NotifyError, RunState, SegmentKind, Timestamp,
            notifier::MockChangeNotifier,
        },
        infrastructure::repository::{
            InMemorySegmentRecordRepository, InMemorySessionDocumentRepository,
        },
    };

    fn key() -> DocumentKey {
        DocumentKey::new("ALICE_BOB".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_subscribe_to_missing_document_pushes_none() {
        // テスト項目: 未作成のドキュメントを購読すると None が送信される
        // given (前提条件):
        let mut notifier = MockChangeNotifier::new();
        notifier
            .expect_watch_document()
            .times(1)
            .returning(|_, _, _| Ok(()));
        notifier
            .expect_push_document()
            .withf(|connection, subscription, document| {
                connection.value() == 1 && subscription.value() == 7 && document.is_none()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let usecase = SubscribeDocumentUseCase::new(
            Arc::new(InMemorySessionDocumentRepository::new()),
            Arc::new(notifier),
            WriteGate::new(),
        );

        // when (操作):
        let result = usecase
            .execute(ConnectionId::new(1), SubscriptionId::new(7), key())
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_pushes_existing_document() {
        // テスト項目: 既存ドキュメントを購読するとそのスナップショットが送信される
        // given (前提条件):
        let repository = InMemorySessionDocumentRepository::new();
        repository
            .create_if_absent(
                key(),
                DocumentFields {
                    remaining_seconds: 1500,
                    run_state: RunState::Stopped,
                    active_mode: SegmentKind::Focus,
                    focus_duration_minutes: 25,
                    break_duration_minutes: 5,
                    last_writer: "ALICE".to_string(),
                },
                Timestamp::new(1),
            )
            .await;
        let mut notifier = MockChangeNotifier::new();
        notifier
            .expect_watch_document()
            .times(1)
            .returning(|_, _, _| Ok(()));
        notifier
            .expect_push_document()
            .withf(|_, _, document| {
                document
                    .as_ref()
                    .is_some_and(|document| document.remaining_seconds == 1500)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let usecase =
            SubscribeDocumentUseCase::new(Arc::new(repository), Arc::new(notifier), WriteGate::new());

        // when (操作):
        let result = usecase
            .execute(ConnectionId::new(1), SubscriptionId::new(1), key())
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_from_unknown_connection_fails() {
        // テスト項目: 接続が登録されていない場合はエラーになり、スナップショットは送信されない
        // given (前提条件):
        let mut notifier = MockChangeNotifier::new();
        notifier
            .expect_watch_records()
            .times(1)
            .returning(|connection, _, _| Err(NotifyError::ConnectionNotFound(connection.value())));
        notifier.expect_push_records().times(0);
        let usecase = SubscribeRecordsUseCase::new(
            Arc::new(InMemorySegmentRecordRepository::new()),
            Arc::new(notifier),
            WriteGate::new(),
        );

        // when (操作):
        let result = usecase
            .execute(ConnectionId::new(9), SubscriptionId::new(1), key())
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SubscribeError::ConnectionGone(NotifyError::ConnectionNotFound(9)))
        );
    }
}
