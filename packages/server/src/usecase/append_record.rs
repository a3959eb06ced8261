//! UseCase: セグメントログへの追記
//!
//! 追記後、そのキーのログ購読者に最新の一覧（降順）を配信します。

use std::sync::Arc;

use tandem_shared::time::TimestampIssuer;

use crate::domain::{
    ChangeNotifier, NewSegmentRecord, SegmentRecord, SegmentRecordRepository, Timestamp,
};

use super::WriteGate;

/// セグメントログ追記のユースケース
pub struct AppendRecordUseCase {
    repository: Arc<dyn SegmentRecordRepository>,
    notifier: Arc<dyn ChangeNotifier>,
    issuer: Arc<TimestampIssuer>,
    gate: WriteGate,
}

impl AppendRecordUseCase {
    pub fn new(
        repository: Arc<dyn SegmentRecordRepository>,
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

    pub async fn execute(&self, record: NewSegmentRecord) -> SegmentRecord {
        let _gate = self.gate.enter().await;
        let recorded_at = Timestamp::new(self.issuer.issue());
        let key = record.pairing_key.clone();

        let stored = self.repository.append(record, recorded_at).await;
        tracing::info!(
            "Record {} appended to '{}' ({} min)",
            stored.id.as_str(),
            key.as_str(),
            stored.duration_minutes
        );

        let records = self.repository.list_by_key(&key).await;
        self.notifier.broadcast_records(&key, records).await;
        stored
    }
}
