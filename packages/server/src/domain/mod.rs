//! ドメイン層
//!
//! ストアが扱うエンティティ、値オブジェクト、および
//! Infrastructure 層が実装するインターフェース（trait）を定義します。

pub mod entity;
pub mod error;
pub mod notifier;
pub mod repository;
pub mod value_object;

pub use entity::{
    DocumentFields, DocumentPatch, NewSegmentRecord, RunState, SegmentKind, SegmentRecord,
    SessionDocument,
};
pub use error::{DomainError, NotifyError, RepositoryError};
pub use notifier::{ChangeNotifier, PusherChannel};
pub use repository::{SegmentRecordRepository, SessionDocumentRepository};
pub use value_object::{ConnectionId, DocumentKey, RecordId, SubscriptionId, Timestamp};
