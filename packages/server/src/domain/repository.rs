//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{
    DocumentFields, DocumentKey, DocumentPatch, NewSegmentRecord, RepositoryError, SegmentRecord,
    SessionDocument, Timestamp,
};

/// 共有セッションドキュメントの Repository
///
/// キーごとに最大 1 つのドキュメントを保持します。削除操作は提供しません。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionDocumentRepository: Send + Sync {
    /// ドキュメントを取得（存在しない場合は `None`）
    async fn get(&self, key: &DocumentKey) -> Option<SessionDocument>;

    /// ドキュメントが存在しない場合のみ作成
    ///
    /// 作成した場合は `Some`、既に存在した場合は `None` を返す。
    async fn create_if_absent(
        &self,
        key: DocumentKey,
        fields: DocumentFields,
        written_at: Timestamp,
    ) -> Option<SessionDocument>;

    /// 既存ドキュメントに浅いマージでパッチを適用
    async fn merge_patch(
        &self,
        key: &DocumentKey,
        patch: DocumentPatch,
        written_at: Timestamp,
    ) -> Result<SessionDocument, RepositoryError>;
}

/// セグメントログの Repository（追記のみ）
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SegmentRecordRepository: Send + Sync {
    /// レコードを追記し、ID を採番した保存済みレコードを返す
    async fn append(&self, record: NewSegmentRecord, recorded_at: Timestamp) -> SegmentRecord;

    /// キーに属するレコードを recorded_at の降順で取得
    async fn list_by_key(&self, key: &DocumentKey) -> Vec<SegmentRecord>;
}
