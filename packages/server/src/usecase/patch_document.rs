//! UseCase: ドキュメントへのパッチ適用（浅いマージ）

use std::sync::Arc;

use tandem_shared::time::TimestampIssuer;

use crate::domain::{
    ChangeNotifier, DocumentKey, DocumentPatch, SessionDocument, SessionDocumentRepository,
    Timestamp,
};

use super::{WriteDocumentError, WriteGate};

/// パッチ適用のユースケース
pub struct PatchDocumentUseCase {
    repository: Arc<dyn SessionDocumentRepository>,
    notifier: Arc<dyn ChangeNotifier>,
    issuer: Arc<TimestampIssuer>,
    gate: WriteGate,
}

impl PatchDocumentUseCase {
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

    /// パッチを適用し、マージ後のドキュメントを購読者に配信する
    ///
    /// ドキュメントが存在しない場合は `WriteDocumentError::NotFound`
    pub async fn execute(
        &self,
        key: DocumentKey,
        patch: DocumentPatch,
    ) -> Result<SessionDocument, WriteDocumentError> {
        let _gate = self.gate.enter().await;
        let written_at = Timestamp::new(self.issuer.issue());

        let document = self
            .repository
            .merge_patch(&key, patch, written_at)
            .await?;
        tracing::debug!(
            "Document '{}' patched by '{}' at {}",
            key.as_str(),
            document.last_writer,
            written_at.value()
        );

        self.notifier
            .broadcast_document(&key, document.clone())
            .await;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        RepositoryError, RunState, notifier::MockChangeNotifier,
        repository::MockSessionDocumentRepository,
    };
    use tandem_shared::time::FixedClock;

    fn issuer() -> Arc<TimestampIssuer> {
        Arc::new(TimestampIssuer::new(Arc::new(FixedClock::new(42))))
    }

    fn key() -> DocumentKey {
        DocumentKey::new("ALICE_BOB".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_patch_of_missing_document_returns_not_found() {
        // テスト項目: 存在しないドキュメントへのパッチは NotFound になり、配信されない
        // given (前提条件):
        let mut repository = MockSessionDocumentRepository::new();
        repository
            .expect_merge_patch()
            .times(1)
            .returning(|key, _, _| Err(RepositoryError::DocumentNotFound(key.as_str().to_string())));
        let mut notifier = MockChangeNotifier::new();
        notifier.expect_broadcast_document().times(0);
        let usecase = PatchDocumentUseCase::new(
            Arc::new(repository),
            Arc::new(notifier),
            issuer(),
            WriteGate::new(),
        );

        // when (操作):
        let result = usecase
            .execute(
                key(),
                DocumentPatch {
                    run_state: Some(RunState::Paused),
                    last_writer: "ALICE".to_string(),
                    ..Default::default()
                },
            )
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(WriteDocumentError::NotFound("ALICE_BOB".to_string()))
        );
    }

    #[tokio::test]
    async fn test_patch_uses_issued_timestamp_and_broadcasts() {
        // テスト項目: 発行されたタイムスタンプでマージされ、結果が配信される
        // given (前提条件):
        let mut repository = MockSessionDocumentRepository::new();
        repository
            .expect_merge_patch()
            .withf(|_, patch, written_at| {
                patch.run_state == Some(RunState::Running) && *written_at == Timestamp::new(42)
            })
            .times(1)
            .returning(|key, patch, written_at| {
                let mut document = SessionDocument::create(
                    key.clone(),
                    crate::domain::DocumentFields {
                        remaining_seconds: 1500,
                        run_state: RunState::Stopped,
                        active_mode: crate::domain::SegmentKind::Focus,
                        focus_duration_minutes: 25,
                        break_duration_minutes: 5,
                        last_writer: "BOB".to_string(),
                    },
                    Timestamp::new(1),
                );
                document.apply_patch(patch, written_at);
                Ok(document)
            });
        let mut notifier = MockChangeNotifier::new();
        notifier
            .expect_broadcast_document()
            .withf(|_, document| document.run_state == RunState::Running)
            .times(1)
            .returning(|_, _| ());
        let usecase = PatchDocumentUseCase::new(
            Arc::new(repository),
            Arc::new(notifier),
            issuer(),
            WriteGate::new(),
        );

        // when (操作):
        let document = usecase
            .execute(
                key(),
                DocumentPatch {
                    run_state: Some(RunState::Running),
                    last_writer: "ALICE".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(document.last_writer, "ALICE");
        assert_eq!(document.remaining_seconds, 1500);
        assert_eq!(document.write_timestamp, Timestamp::new(42));
    }
}
