//! 変更通知（プッシュ）の trait 定義
//!
//! ## 責務
//!
//! - 接続ごとの送信チャンネルの管理
//! - キーごとの購読者（ドキュメント / ログ）の管理
//! - 変更を購読者に配信
//!
//! WebSocket の生成は UI 層で行われ、生成された sender だけがここに渡されます。

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use super::{ConnectionId, DocumentKey, NotifyError, SegmentRecord, SessionDocument, SubscriptionId};

/// Outbound channel of one connection (serialized JSON frames)
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    /// 接続を登録
    async fn register_connection(&self, connection: ConnectionId, sender: PusherChannel);

    /// 接続を登録解除（その接続の購読も全て解除）
    async fn unregister_connection(&self, connection: ConnectionId);

    /// ドキュメントの購読を登録
    async fn watch_document(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        key: DocumentKey,
    ) -> Result<(), NotifyError>;

    /// セグメントログの購読を登録
    async fn watch_records(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        key: DocumentKey,
    ) -> Result<(), NotifyError>;

    /// 購読を解除（存在しない場合も成功）
    async fn unwatch(&self, connection: ConnectionId, subscription: SubscriptionId);

    /// 特定の購読にドキュメントのスナップショットを送信
    async fn push_document(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        document: Option<SessionDocument>,
    ) -> Result<(), NotifyError>;

    /// 特定の購読にレコード一覧を送信
    async fn push_records(
        &self,
        connection: ConnectionId,
        subscription: SubscriptionId,
        records: Vec<SegmentRecord>,
    ) -> Result<(), NotifyError>;

    /// キーのドキュメント購読者全員に配信（送信失敗は許容）
    async fn broadcast_document(&self, key: &DocumentKey, document: SessionDocument);

    /// キーのログ購読者全員に配信（送信失敗は許容）
    async fn broadcast_records(&self, key: &DocumentKey, records: Vec<SegmentRecord>);
}
