//! InMemory SegmentRecord Repository 実装
//!
//! 追記のみの Vec をインメモリ DB として使用します。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    DocumentKey, NewSegmentRecord, RecordId, SegmentRecord, SegmentRecordRepository, Timestamp,
};

/// インメモリ SegmentRecord Repository 実装
#[derive(Default)]
pub struct InMemorySegmentRecordRepository {
    records: Arc<Mutex<Vec<SegmentRecord>>>,
}

impl InMemorySegmentRecordRepository {
    /// 新しい InMemorySegmentRecordRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SegmentRecordRepository for InMemorySegmentRecordRepository {
    async fn append(&self, record: NewSegmentRecord, recorded_at: Timestamp) -> SegmentRecord {
        let stored = SegmentRecord::from_new(record, RecordId::generate(), recorded_at);
        let mut records = self.records.lock().await;
        records.push(stored.clone());
        stored
    }

    async fn list_by_key(&self, key: &DocumentKey) -> Vec<SegmentRecord> {
        let records = self.records.lock().await;
        let mut matching: Vec<SegmentRecord> = records
            .iter()
            .rev()
            .filter(|record| &record.pairing_key == key)
            .cloned()
            .collect();

        // Newest first; equal timestamps keep the latest append first
        matching.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        matching
    }
}
