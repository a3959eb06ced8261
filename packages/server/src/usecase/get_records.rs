//! UseCase: セグメントログの取得

use std::sync::Arc;

use crate::domain::{DocumentKey, SegmentRecord, SegmentRecordRepository};

/// セグメントログ取得のユースケース
pub struct GetRecordsUseCase {
    repository: Arc<dyn SegmentRecordRepository>,
}

impl GetRecordsUseCase {
    pub fn new(repository: Arc<dyn SegmentRecordRepository>) -> Self {
        Self { repository }
    }

    /// recorded_at の降順で返す
    pub async fn execute(&self, key: &DocumentKey) -> Vec<SegmentRecord> {
        self.repository.list_by_key(key).await
    }
}
