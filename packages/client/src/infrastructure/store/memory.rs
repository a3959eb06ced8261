//! In-process RemoteStore.
//!
//! Several clients can share one instance (it is cheap to clone), which makes
//! it usable for end-to-end tests of two participants and for single-process
//! demos. Failures can be injected per operation, and documents can be evicted
//! to exercise the recovery paths.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use tandem_shared::time::{Clock, TimestampIssuer};
use tokio::sync::{Mutex, mpsc};

use crate::domain::{
    DocumentSeed, NewSegmentRecord, PairingKey, ParticipantId, RemoteStore, SegmentLogRecord,
    SharedSessionDocument, StatePatch, StoreError, Subscription,
};

/// Operation targeted by an injected failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    CreateDocument,
    PatchDocument,
    GetDocument,
    AppendRecord,
    SubscribeDocument,
    SubscribeRecords,
}

type DocumentSink = mpsc::UnboundedSender<Option<SharedSessionDocument>>;
type RecordSink = mpsc::UnboundedSender<Vec<SegmentLogRecord>>;

#[derive(Default)]
struct StoreState {
    documents: HashMap<String, SharedSessionDocument>,
    /// Append order (= recorded_at order)
    records: Vec<SegmentLogRecord>,
    document_watchers: Vec<(String, DocumentSink)>,
    record_watchers: Vec<(String, RecordSink)>,
    faults: HashMap<StoreOperation, VecDeque<StoreError>>,
}

impl StoreState {
    fn take_fault(&mut self, operation: StoreOperation) -> Result<(), StoreError> {
        match self.faults.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => {
                tracing::debug!("Injected failure for {:?}: {}", operation, error);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn records_of(&self, key: &str) -> Vec<SegmentLogRecord> {
        self.records
            .iter()
            .rev()
            .filter(|record| record.pairing_key == key)
            .cloned()
            .collect()
    }

    /// Watchers whose receiver is gone are dropped here
    fn publish_document(&mut self, key: &str, document: Option<SharedSessionDocument>) {
        self.document_watchers
            .retain(|(watched, sink)| watched != key || sink.send(document.clone()).is_ok());
    }

    fn publish_records(&mut self, key: &str) {
        let records = self.records_of(key);
        self.record_watchers
            .retain(|(watched, sink)| watched != key || sink.send(records.clone()).is_ok());
    }
}

/// インメモリ RemoteStore 実装
#[derive(Clone)]
pub struct InMemoryRemoteStore {
    state: Arc<Mutex<StoreState>>,
    issuer: Arc<TimestampIssuer>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::with_issuer(TimestampIssuer::default())
    }

    /// Use `clock` as the source of write timestamps
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_issuer(TimestampIssuer::new(clock))
    }

    fn with_issuer(issuer: TimestampIssuer) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            issuer: Arc::new(issuer),
        }
    }

    /// Make the next call of `operation` fail with `error` (queued, one per call)
    pub async fn inject_failure(&self, operation: StoreOperation, error: StoreError) {
        let mut state = self.state.lock().await;
        state.faults.entry(operation).or_default().push_back(error);
    }

    /// Evict a document; watchers observe it as absent
    pub async fn delete_document(&self, key: &PairingKey) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.documents.remove(key.as_str()).is_some();
        if removed {
            state.publish_document(key.as_str(), None);
        }
        removed
    }

    /// End every live subscription from the store side, as a dropped connection would
    pub async fn close_subscriptions(&self) {
        let mut state = self.state.lock().await;
        state.document_watchers.clear();
        state.record_watchers.clear();
    }

    /// Peek at a stored document
    pub async fn document(&self, key: &PairingKey) -> Option<SharedSessionDocument> {
        self.state.lock().await.documents.get(key.as_str()).cloned()
    }

    /// Peek at the stored records of a key, newest first
    pub async fn records(&self, key: &PairingKey) -> Vec<SegmentLogRecord> {
        self.state.lock().await.records_of(key.as_str())
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn create_document(
        &self,
        key: &PairingKey,
        seed: DocumentSeed,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        state.take_fault(StoreOperation::CreateDocument)?;
        if state.documents.contains_key(key.as_str()) {
            return Ok(false);
        }

        let document = SharedSessionDocument {
            remaining_seconds: seed.remaining_seconds,
            run_state: seed.run_state,
            active_mode: seed.active_mode,
            focus_duration_minutes: seed.focus_duration_minutes,
            break_duration_minutes: seed.break_duration_minutes,
            last_writer: seed.last_writer,
            write_timestamp: self.issuer.issue(),
        };
        state
            .documents
            .insert(key.as_str().to_string(), document.clone());
        state.publish_document(key.as_str(), Some(document));
        Ok(true)
    }

    async fn patch_document(
        &self,
        key: &PairingKey,
        patch: StatePatch,
        writer: &ParticipantId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.take_fault(StoreOperation::PatchDocument)?;
        let write_timestamp = self.issuer.issue();
        let document = state
            .documents
            .get_mut(key.as_str())
            .ok_or_else(|| StoreError::NotFound(key.as_str().to_string()))?;

        if let Some(remaining_seconds) = patch.remaining_seconds {
            document.remaining_seconds = remaining_seconds;
        }
        if let Some(run_state) = patch.run_state {
            document.run_state = run_state;
        }
        if let Some(active_mode) = patch.active_mode {
            document.active_mode = active_mode;
        }
        if let Some(minutes) = patch.focus_duration_minutes {
            document.focus_duration_minutes = minutes;
        }
        if let Some(minutes) = patch.break_duration_minutes {
            document.break_duration_minutes = minutes;
        }
        document.last_writer = writer.as_str().to_string();
        document.write_timestamp = write_timestamp;

        let document = document.clone();
        state.publish_document(key.as_str(), Some(document));
        Ok(())
    }

    async fn get_document(
        &self,
        key: &PairingKey,
    ) -> Result<Option<SharedSessionDocument>, StoreError> {
        let mut state = self.state.lock().await;
        state.take_fault(StoreOperation::GetDocument)?;
        Ok(state.documents.get(key.as_str()).cloned())
    }

    async fn append_record(&self, record: NewSegmentRecord) -> Result<String, StoreError> {
        let mut state = self.state.lock().await;
        state.take_fault(StoreOperation::AppendRecord)?;
        if record.duration_minutes == 0 {
            return Err(StoreError::Rejected(
                "durationMinutes must be at least 1".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let key = record.pairing_key.as_str().to_string();
        state.records.push(SegmentLogRecord {
            id: id.clone(),
            pairing_key: key.clone(),
            recorded_at: self.issuer.issue(),
            segment_kind: record.segment_kind,
            duration_minutes: record.duration_minutes,
        });
        state.publish_records(&key);
        Ok(id)
    }

    async fn subscribe_document(
        &self,
        key: &PairingKey,
    ) -> Result<Subscription<Option<SharedSessionDocument>>, StoreError> {
        let mut state = self.state.lock().await;
        state.take_fault(StoreOperation::SubscribeDocument)?;
        let (sink, receiver) = mpsc::unbounded_channel();
        let snapshot = state.documents.get(key.as_str()).cloned();
        // 購読登録とスナップショット送信を同じロック内で行う
        let _ = sink.send(snapshot);
        state
            .document_watchers
            .push((key.as_str().to_string(), sink));
        Ok(Subscription::new(receiver))
    }

    async fn subscribe_records(
        &self,
        key: &PairingKey,
    ) -> Result<Subscription<Vec<SegmentLogRecord>>, StoreError> {
        let mut state = self.state.lock().await;
        state.take_fault(StoreOperation::SubscribeRecords)?;
        let (sink, receiver) = mpsc::unbounded_channel();
        let _ = sink.send(state.records_of(key.as_str()));
        state.record_watchers.push((key.as_str().to_string(), sink));
        Ok(Subscription::new(receiver))
    }
}
