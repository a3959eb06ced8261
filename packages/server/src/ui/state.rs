//! Server state shared by all handlers.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tandem_shared::time::TimestampIssuer;

use crate::{
    domain::ConnectionId,
    infrastructure::{
        notifier::WebSocketChangeNotifier,
        repository::{InMemorySegmentRecordRepository, InMemorySessionDocumentRepository},
    },
    usecase::{
        AppendRecordUseCase, CloseConnectionUseCase, CreateDocumentUseCase, GetDocumentUseCase,
        GetRecordsUseCase, OpenConnectionUseCase, PatchDocumentUseCase, SubscribeDocumentUseCase,
        SubscribeRecordsUseCase, UnsubscribeUseCase, WriteGate,
    },
};

/// Shared application state
pub struct AppState {
    pub open_connection_usecase: Arc<OpenConnectionUseCase>,
    pub close_connection_usecase: Arc<CloseConnectionUseCase>,
    pub create_document_usecase: Arc<CreateDocumentUseCase>,
    pub patch_document_usecase: Arc<PatchDocumentUseCase>,
    pub get_document_usecase: Arc<GetDocumentUseCase>,
    pub append_record_usecase: Arc<AppendRecordUseCase>,
    pub get_records_usecase: Arc<GetRecordsUseCase>,
    pub subscribe_document_usecase: Arc<SubscribeDocumentUseCase>,
    pub subscribe_records_usecase: Arc<SubscribeRecordsUseCase>,
    pub unsubscribe_usecase: Arc<UnsubscribeUseCase>,
    /// 接続 ID の採番用カウンター
    next_connection_id: AtomicU64,
}

impl AppState {
    /// インメモリのストアで全ユースケースを組み立てる
    ///
    /// 依存関係は次の順で初期化されます:
    /// 1. Repository
    /// 2. ChangeNotifier
    /// 3. タイムスタンプ発行器と WriteGate
    /// 4. UseCase
    pub fn in_memory() -> Self {
        let documents = Arc::new(InMemorySessionDocumentRepository::new());
        let records = Arc::new(InMemorySegmentRecordRepository::new());
        let notifier = Arc::new(WebSocketChangeNotifier::new());
        let issuer = Arc::new(TimestampIssuer::default());
        let gate = WriteGate::new();

        Self {
            open_connection_usecase: Arc::new(OpenConnectionUseCase::new(notifier.clone())),
            close_connection_usecase: Arc::new(CloseConnectionUseCase::new(notifier.clone())),
            create_document_usecase: Arc::new(CreateDocumentUseCase::new(
                documents.clone(),
                notifier.clone(),
                issuer.clone(),
                gate.clone(),
            )),
            patch_document_usecase: Arc::new(PatchDocumentUseCase::new(
                documents.clone(),
                notifier.clone(),
                issuer.clone(),
                gate.clone(),
            )),
            get_document_usecase: Arc::new(GetDocumentUseCase::new(documents.clone())),
            append_record_usecase: Arc::new(AppendRecordUseCase::new(
                records.clone(),
                notifier.clone(),
                issuer,
                gate.clone(),
            )),
            get_records_usecase: Arc::new(GetRecordsUseCase::new(records.clone())),
            subscribe_document_usecase: Arc::new(SubscribeDocumentUseCase::new(
                documents,
                notifier.clone(),
                gate.clone(),
            )),
            subscribe_records_usecase: Arc::new(SubscribeRecordsUseCase::new(
                records,
                notifier.clone(),
                gate,
            )),
            unsubscribe_usecase: Arc::new(UnsubscribeUseCase::new(notifier)),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// 新しい接続 ID を採番
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed))
    }
}
