//! UseCase: ドキュメントの作成（存在しない場合のみ）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CreateDocumentUseCase::execute() メソッド
//!
//! ### どのような状況を想定しているか
//! - 正常系：未作成のキーに作成し、購読者に配信される
//! - 競合：既に存在するキーでは何も変更されず、配信もされない

use std::sync::Arc;

use tandem_shared::time::TimestampIssuer;

use crate::domain::{ChangeNotifier, DocumentFields, DocumentKey, SessionDocumentRepository, Timestamp};

use super::WriteGate;

/// ドキュメント作成のユースケース
pub struct CreateDocumentUseCase {
    repository: Arc<dyn SessionDocumentRepository>,
    notifier: Arc<dyn ChangeNotifier>,
    issuer: Arc<TimestampIssuer>,
    gate: WriteGate,
}

impl CreateDocumentUseCase {
    pub fn new(
        repository: Arc<dyn SessionDocumentRepository>,
        notifier: Arc<dyn ChangeNotifier>,
        issuer: Arc<TimestampIssuer>,
        gate: WriteGate,
    ) -> Self {
        Self {
            repository,
            notifier,
            issuer,
            gate,
        }
    }

    /// ドキュメントが存在しなければ作成し、購読者に配信する
    ///
    /// # Returns
    ///
    /// 作成した場合は `true`、既に存在していた場合は `false`
    pub async fn execute(&self, key: DocumentKey, fields: DocumentFields) -> bool {
        let _gate = self.gate.enter().await;
        let written_at = Timestamp::new(self.issuer.issue());

        match self
            .repository
            .create_if_absent(key.clone(), fields, written_at)
            .await
        {
            Some(document) => {
                tracing::info!(
                    "Document '{}' created by '{}'",
                    key.as_str(),
                    document.last_writer
                );
                self.notifier.broadcast_document(&key, document).await;
                true
            }
            None => {
                tracing::debug!("Document '{}' already exists, create skipped", key.as_str());
                false
            }
        }
    }
}
