//! UseCase 層
//!
//! ストアのプリミティブ（作成・パッチ・取得・追記・購読）ごとに 1 つのユースケースを定義します。
//!
//! 書き込みとその配信、および購読開始時のスナップショット送信は
//! [`WriteGate`] の内側で行います。これにより、1 つのキーに対する通知は
//! 常に書き込み順で配信されます。

pub mod append_record;
pub mod connection;
pub mod create_document;
pub mod error;
pub mod get_document;
pub mod get_records;
pub mod patch_document;
pub mod subscribe;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

pub use append_record::AppendRecordUseCase;
pub use connection::{CloseConnectionUseCase, OpenConnectionUseCase};
pub use create_document::CreateDocumentUseCase;
pub use error::{SubscribeError, WriteDocumentError};
pub use get_document::GetDocumentUseCase;
pub use get_records::GetRecordsUseCase;
pub use patch_document::PatchDocumentUseCase;
pub use subscribe::{SubscribeDocumentUseCase, SubscribeRecordsUseCase, UnsubscribeUseCase};

/// Serializes store writes with their fan-out
#[derive(Clone, Default)]
pub struct WriteGate(Arc<Mutex<()>>);

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the gate until the returned guard is dropped
    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}
