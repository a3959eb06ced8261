//! ドメイン層
//!
//! タイマーの状態機械、ペアリングキー、共有ドキュメントの調停ロジック、
//! および外部コラボレーター（ストア・設定・通知）の trait を定義します。

pub mod document;
pub mod error;
pub mod identity;
pub mod notifier;
pub mod preference;
pub mod reconcile;
pub mod record;
pub mod store;
pub mod timer;

pub use document::{DocumentSeed, SharedSessionDocument, StatePatch};
pub use error::{PreferenceError, StoreError, ValidationError};
pub use identity::{PairingKey, ParticipantId, pairing_key};
pub use notifier::{Notice, Notifier, Severity};
pub use preference::{PreferenceKey, PreferenceStore, load_durations};
pub use reconcile::{DocumentChange, DocumentField, DocumentTracker, Origin, Reduction, reduce};
pub use record::{NewSegmentRecord, SegmentLogRecord, rounded_minutes};
pub use store::{RemoteStore, Subscription};
pub use timer::{Durations, RunState, TickOutcome, TimerMode, TimerState};
