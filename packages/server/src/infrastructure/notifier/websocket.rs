//! WebSocket を使った ChangeNotifier 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - (接続, 購読 ID) → 監視対象キー の対応を管理
//! - 変更をプロトコルのフレーム（JSON）に変換して送信
//!
//! ## 設計ノート
//!
//! リクエストへの返信と変更通知は同じ sender を通るため、
//! 1 つの接続の中では送信順序がそのまま保たれます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tandem_shared::protocol::{SegmentRecordDto, ServerFrame};
use tokio::sync::Mutex;

use crate::domain::{
    ChangeNotifier, ConnectionId, DocumentKey, NotifyError, PusherChannel, SegmentRecord,
    SessionDocument, SubscriptionId,
};

/// What a subscription is watching
#[derive(Debug, Clone, PartialEq, Eq)]
enum Watch {
    Document(DocumentKey),
    Records(DocumentKey),
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, PusherChannel>,
    subscriptions: HashMap<(ConnectionId, SubscriptionId), Watch>,
}

impl Registry {
    fn ensure_connection(&self, connection: ConnectionId) -> Result<&PusherChannel, NotifyError> {
        self.connections
            .get(&connection)
            .ok_or(NotifyError::ConnectionNotFound(connection.value()))
    }

    fn watchers(&self, wanted: &Watch) -> Vec<(ConnectionId, SubscriptionId)> {
        self.subscriptions
            .iter()
            .filter(|(_, watch)| *watch == wanted)
            .map(|(target, _)| *target)
            .collect()
    }
}

/// WebSocket を使った ChangeNotifier 実装
#[derive(Default)]
pub struct WebSocketChangeNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl WebSocketChangeNotifier {
    /// 新しい WebSocketChangeNotifier を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在の購読数（デバッグ・テスト用）
    pub async fn subscription_count(&self) -> usize {
        self.registry.lock().await.subscriptions.len()
    }
}

fn encode(frame: &ServerFrame) -> Result<String, NotifyError> {
    serde_json::to_string(frame).map_err(|e| NotifyError::PushFailed(e.to_string()))
}

fn send(sender: &PusherChannel, frame: &ServerFrame) -> Result<(), NotifyError> {
    let json = encode(frame)?;
    sender
        .send(json)
        .map_err(|e| NotifyError::PushFailed(e.to_string()))
}

#[async_trait]
impl ChangeNotifier for WebSocketChangeNotifier {
    async fn register_connection(&self, connection: ConnectionId, sender: PusherChannel) {
        let mut registry = self.registry.lock().await;
        registry.connections.insert(connection, sender);
        tracing::debug!("Connection {} registered to ChangeNotifier", connection.value());
    }

    async fn unregister_connection(&self, connection: ConnectionId) {
        let mut registry = self.registry.lock().await;
        registry.connections.remove(&connection);
        registry
            .subscriptions
            .retain(|(owner, _), _| *owner != connection);
        tracing::debug!(
            "Connection {} unregistered from ChangeNotifier",
            connection.value()
        );
    }

    async fn watch_document(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        key: DocumentKey,
    ) -> Result<(), NotifyError> {
        let mut registry = self.registry.lock().await;
        registry.ensure_connection(connection)?;
        registry
            .subscriptions
            .insert((connection, subscription), Watch::Document(key));
        Ok(())
    }

    async fn watch_records(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        key: DocumentKey,
    ) -> Result<(), NotifyError> {
        let mut registry = self.registry.lock().await;
        registry.ensure_connection(connection)?;
        registry
            .subscriptions
            .insert((connection, subscription), Watch::Records(key));
        Ok(())
    }

    async fn unwatch(&self, connection: ConnectionId, subscription: SubscriptionId) {
        let mut registry = self.registry.lock().await;
        if registry
            .subscriptions
            .remove(&(connection, subscription))
            .is_some()
        {
            tracing::debug!(
                "Subscription {} of connection {} removed",
                subscription.value(),
                connection.value()
            );
        }
    }

    async fn push_document(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        document: Option<SessionDocument>,
    ) -> Result<(), NotifyError> {
        let registry = self.registry.lock().await;
        let sender = registry.ensure_connection(connection)?;
        send(
            sender,
            &ServerFrame::DocumentChanged {
                subscription_id: subscription.value(),
                document: document.map(Into::into),
            },
        )
    }

    async fn push_records(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        records: Vec<SegmentRecord>,
    ) -> Result<(), NotifyError> {
        let registry = self.registry.lock().await;
        let sender = registry.ensure_connection(connection)?;
        send(
            sender,
            &ServerFrame::RecordsChanged {
                subscription_id: subscription.value(),
                records: records.into_iter().map(Into::into).collect(),
            },
        )
    }

    async fn broadcast_document(&self, key: &DocumentKey, document: SessionDocument) {
        let registry = self.registry.lock().await;
        for (connection, subscription) in registry.watchers(&Watch::Document(key.clone())) {
            let Some(sender) = registry.connections.get(&connection) else {
                continue;
            };
            let frame = ServerFrame::DocumentChanged {
                subscription_id: subscription.value(),
                document: Some(document.clone().into()),
            };
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = send(sender, &frame) {
                tracing::warn!(
                    "Failed to push document '{}' to connection {}: {}",
                    key.as_str(),
                    connection.value(),
                    e
                );
            }
        }
    }

    async fn broadcast_records(&self, key: &DocumentKey, records: Vec<SegmentRecord>) {
        let registry = self.registry.lock().await;
        let payload: Vec<SegmentRecordDto> = records.into_iter().map(Into::into).collect();
        for (connection, subscription) in registry.watchers(&Watch::Records(key.clone())) {
            let Some(sender) = registry.connections.get(&connection) else {
                continue;
            };
            let frame = ServerFrame::RecordsChanged {
                subscription_id: subscription.value(),
                records: payload.clone(),
            };
            if let Err(e) = send(sender, &frame) {
                tracing::warn!(
                    "Failed to push records of '{}' to connection {}: {}",
                    key.as_str(),
                    connection.value(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentFields, RunState, SegmentKind, Timestamp};
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - キーを購読している接続だけに変更が配信されること
    // - 購読解除・接続解除後は配信されないこと
    // - 未登録の接続への送信がエラーになること
    // ========================================

    fn key(raw: &str) -> DocumentKey {
        DocumentKey::new(raw.to_string()).unwrap()
    }

    fn document(raw_key: &str) -> SessionDocument {
        SessionDocument::create(
            key(raw_key),
            DocumentFields {
                remaining_seconds: 1500,
                run_state: RunState::Running,
                active_mode: SegmentKind::Focus,
                focus_duration_minutes: 25,
                break_duration_minutes: 5,
                last_writer: "ALICE".to_string(),
            },
            Timestamp::new(1),
        )
    }

    fn parse(json: &str) -> ServerFrame {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_document_reaches_only_watchers_of_key() {
        // テスト項目: 同じキーを購読している接続にだけ配信される
        // given (前提条件):
        let notifier = WebSocketChangeNotifier::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        notifier.register_connection(ConnectionId::new(1), tx1).await;
        notifier.register_connection(ConnectionId::new(2), tx2).await;
        notifier
            .watch_document(ConnectionId::new(1), SubscriptionId::new(10), key("ALICE_BOB"))
            .await
            .unwrap();
        notifier
            .watch_document(ConnectionId::new(2), SubscriptionId::new(20), key("CAROL_DAVE"))
            .await
            .unwrap();

        // when (操作):
        notifier
            .broadcast_document(&key("ALICE_BOB"), document("ALICE_BOB"))
            .await;

        // then (期待する結果):
        let frame = parse(&rx1.recv().await.unwrap());
        assert!(matches!(
            frame,
            ServerFrame::DocumentChanged {
                subscription_id: 10,
                document: Some(_)
            }
        ));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unwatch_stops_delivery() {
        // テスト項目: 購読解除後は配信されない
        // given (前提条件):
        let notifier = WebSocketChangeNotifier::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        notifier.register_connection(ConnectionId::new(1), tx).await;
        notifier
            .watch_records(ConnectionId::new(1), SubscriptionId::new(5), key("ALICE_BOB"))
            .await
            .unwrap();

        // when (操作):
        notifier
            .unwatch(ConnectionId::new(1), SubscriptionId::new(5))
            .await;
        notifier.broadcast_records(&key("ALICE_BOB"), vec![]).await;

        // then (期待する結果):
        assert!(rx.try_recv().is_err());
        assert_eq!(notifier.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_connection_drops_its_subscriptions() {
        // テスト項目: 接続解除でその接続の購読も全て削除される
        // given (前提条件):
        let notifier = WebSocketChangeNotifier::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        notifier.register_connection(ConnectionId::new(1), tx).await;
        notifier
            .watch_document(ConnectionId::new(1), SubscriptionId::new(1), key("ALICE_BOB"))
            .await
            .unwrap();
        notifier
            .watch_records(ConnectionId::new(1), SubscriptionId::new(2), key("ALICE_BOB"))
            .await
            .unwrap();

        // when (操作):
        notifier.unregister_connection(ConnectionId::new(1)).await;

        // then (期待する結果):
        assert_eq!(notifier.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn test_push_to_unknown_connection_fails() {
        // テスト項目: 未登録の接続への送信は ConnectionNotFound エラーになる
        // given (前提条件):
        let notifier = WebSocketChangeNotifier::new();

        // when (操作):
        let result = notifier
            .push_document(ConnectionId::new(99), SubscriptionId::new(1), None)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(NotifyError::ConnectionNotFound(99)));
    }

    #[tokio::test]
    async fn test_push_missing_document_sends_null() {
        // テスト項目: ドキュメントが無い場合は document: null が送信される
        // given (前提条件):
        let notifier = WebSocketChangeNotifier::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        notifier.register_connection(ConnectionId::new(1), tx).await;

        // when (操作):
        notifier
            .push_document(ConnectionId::new(1), SubscriptionId::new(3), None)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            parse(&rx.recv().await.unwrap()),
            ServerFrame::DocumentChanged {
                subscription_id: 3,
                document: None
            }
        );
    }
}
