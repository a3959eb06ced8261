//! RemoteStore backed by a tandem-server WebSocket connection.
//!
//! ## 設計ノート
//!
//! - リクエストごとに `requestId` を採番し、返信を oneshot で待ち合わせる
//! - 購読 ID はリクエスト ID と同じ値。返信より前に届く可能性のある
//!   スナップショットを取りこぼさないよう、送信前に受け口を登録する
//! - 読み取りタスクが終了すると、待機中のリクエストと購読は全て閉じられる

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tandem_shared::protocol::{ClientFrame, ErrorCode, ReplyDto, ServerFrame};
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use super::conversion::patch_dto;
use crate::domain::{
    DocumentSeed, NewSegmentRecord, PairingKey, ParticipantId, RemoteStore, SegmentLogRecord,
    SharedSessionDocument, StatePatch, StoreError, Subscription,
};

type DocumentSink = mpsc::UnboundedSender<Option<SharedSessionDocument>>;
type RecordSink = mpsc::UnboundedSender<Vec<SegmentLogRecord>>;

#[derive(Default)]
struct Routes {
    pending: HashMap<u64, oneshot::Sender<ReplyDto>>,
    documents: HashMap<u64, DocumentSink>,
    records: HashMap<u64, RecordSink>,
    closed: bool,
}

/// WebSocket RemoteStore 実装
pub struct WebSocketRemoteStore {
    outbound: mpsc::UnboundedSender<String>,
    routes: Arc<Mutex<Routes>>,
    next_request_id: AtomicU64,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl WebSocketRemoteStore {
    /// Connect to `url` (e.g. `ws://127.0.0.1:8080/ws`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        tracing::info!("Connected to store at {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let routes = Arc::new(Mutex::new(Routes::default()));

        let write_task = tokio::spawn(async move {
            while let Some(json) = outbound_rx.recv().await {
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::warn!("Failed to send frame to store: {}", e);
                    break;
                }
            }
        });

        let routes_for_read = routes.clone();
        let read_task = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerFrame>(text.as_str()) {
                            Ok(frame) => route(&routes_for_read, frame).await,
                            Err(e) => tracing::warn!("Unparsable frame from store: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Store closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            // 待機中のリクエストと購読を全て閉じる
            let mut routes = routes_for_read.lock().await;
            routes.closed = true;
            routes.pending.clear();
            routes.documents.clear();
            routes.records.clear();
        });

        Ok(Self {
            outbound,
            routes,
            next_request_id: AtomicU64::new(1),
            read_task,
            write_task,
        })
    }

    fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    fn send(&self, frame: &ClientFrame) -> Result<(), StoreError> {
        let json = serde_json::to_string(frame).map_err(|e| StoreError::Rejected(e.to_string()))?;
        self.outbound.send(json).map_err(|_| StoreError::Closed)
    }

    async fn request(&self, request_id: u64, frame: ClientFrame) -> Result<ReplyDto, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut routes = self.routes.lock().await;
            if routes.closed {
                return Err(StoreError::Closed);
            }
            routes.pending.insert(request_id, reply_tx);
        }

        if let Err(e) = self.send(&frame) {
            self.routes.lock().await.pending.remove(&request_id);
            return Err(e);
        }

        match reply_rx.await.map_err(|_| StoreError::Closed)? {
            ReplyDto::Failed { code, message } => Err(match code {
                ErrorCode::NotFound => StoreError::NotFound(message),
                ErrorCode::Invalid | ErrorCode::Internal => StoreError::Rejected(message),
            }),
            reply => Ok(reply),
        }
    }

    fn cancel_on_drop(&self, subscription_id: u64) -> impl FnOnce() + Send + 'static {
        let outbound = self.outbound.clone();
        move || {
            if let Ok(json) = serde_json::to_string(&ClientFrame::Unsubscribe { subscription_id })
            {
                let _ = outbound.send(json);
            }
        }
    }
}

impl Drop for WebSocketRemoteStore {
    fn drop(&mut self) {
        self.read_task.abort();
        self.write_task.abort();
    }
}

async fn route(routes: &Mutex<Routes>, frame: ServerFrame) {
    let mut routes = routes.lock().await;
    match frame {
        ServerFrame::Reply { request_id, result } => {
            if let Some(waiter) = routes.pending.remove(&request_id) {
                let _ = waiter.send(result);
            } else {
                tracing::debug!("Reply for unknown request {}", request_id);
            }
        }
        ServerFrame::DocumentChanged {
            subscription_id,
            document,
        } => {
            let delivered = routes
                .documents
                .get(&subscription_id)
                .is_some_and(|sink| sink.send(document.map(Into::into)).is_ok());
            if !delivered {
                routes.documents.remove(&subscription_id);
            }
        }
        ServerFrame::RecordsChanged {
            subscription_id,
            records,
        } => {
            let records: Vec<SegmentLogRecord> = records.into_iter().map(Into::into).collect();
            let delivered = routes
                .records
                .get(&subscription_id)
                .is_some_and(|sink| sink.send(records).is_ok());
            if !delivered {
                routes.records.remove(&subscription_id);
            }
        }
    }
}

fn unexpected(reply: ReplyDto) -> StoreError {
    StoreError::Rejected(format!("unexpected reply: {:?}", reply))
}

#[async_trait]
impl RemoteStore for WebSocketRemoteStore {
    async fn create_document(
        &self,
        key: &PairingKey,
        seed: DocumentSeed,
    ) -> Result<bool, StoreError> {
        let request_id = self.next_request_id();
        let frame = ClientFrame::CreateDocument {
            request_id,
            key: key.as_str().to_string(),
            document: seed.into(),
        };
        match self.request(request_id, frame).await? {
            ReplyDto::Created { created } => Ok(created),
            reply => Err(unexpected(reply)),
        }
    }

    async fn patch_document(
        &self,
        key: &PairingKey,
        patch: StatePatch,
        writer: &ParticipantId,
    ) -> Result<(), StoreError> {
        let request_id = self.next_request_id();
        let frame = ClientFrame::PatchDocument {
            request_id,
            key: key.as_str().to_string(),
            patch: patch_dto(patch, writer),
        };
        match self.request(request_id, frame).await? {
            ReplyDto::Ack => Ok(()),
            reply => Err(unexpected(reply)),
        }
    }

    async fn get_document(
        &self,
        key: &PairingKey,
    ) -> Result<Option<SharedSessionDocument>, StoreError> {
        let request_id = self.next_request_id();
        let frame = ClientFrame::GetDocument {
            request_id,
            key: key.as_str().to_string(),
        };
        match self.request(request_id, frame).await? {
            ReplyDto::Document { document } => Ok(document.map(Into::into)),
            reply => Err(unexpected(reply)),
        }
    }

    async fn append_record(&self, record: NewSegmentRecord) -> Result<String, StoreError> {
        let request_id = self.next_request_id();
        let frame = ClientFrame::AppendRecord {
            request_id,
            record: record.into(),
        };
        match self.request(request_id, frame).await? {
            ReplyDto::RecordAppended { id } => Ok(id),
            reply => Err(unexpected(reply)),
        }
    }

    async fn subscribe_document(
        &self,
        key: &PairingKey,
    ) -> Result<Subscription<Option<SharedSessionDocument>>, StoreError> {
        let request_id = self.next_request_id();
        let (sink, receiver) = mpsc::unbounded_channel();
        self.routes.lock().await.documents.insert(request_id, sink);

        let frame = ClientFrame::SubscribeDocument {
            request_id,
            key: key.as_str().to_string(),
        };
        match self.request(request_id, frame).await {
            Ok(ReplyDto::Subscribed { .. }) => {
                Ok(Subscription::new(receiver).with_cancel(self.cancel_on_drop(request_id)))
            }
            other => {
                self.routes.lock().await.documents.remove(&request_id);
                Err(other.map_or_else(|e| e, unexpected))
            }
        }
    }

    async fn subscribe_records(
        &self,
        key: &PairingKey,
    ) -> Result<Subscription<Vec<SegmentLogRecord>>, StoreError> {
        let request_id = self.next_request_id();
        let (sink, receiver) = mpsc::unbounded_channel();
        self.routes.lock().await.records.insert(request_id, sink);

        let frame = ClientFrame::SubscribeRecords {
            request_id,
            key: key.as_str().to_string(),
        };
        match self.request(request_id, frame).await {
            Ok(ReplyDto::Subscribed { .. }) => {
                Ok(Subscription::new(receiver).with_cancel(self.cancel_on_drop(request_id)))
            }
            other => {
                self.routes.lock().await.records.remove(&request_id);
                Err(other.map_or_else(|e| e, unexpected))
            }
        }
    }
}
