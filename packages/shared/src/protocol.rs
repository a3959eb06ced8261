//! Wire protocol for the document store WebSocket (`/ws`).
//!
//! Every frame is a JSON text message, internally tagged by `type`.
//! The client side sends [`ClientFrame`]s; the server answers each request
//! with exactly one [`ServerFrame::Reply`] carrying the same `requestId`, and
//! pushes [`ServerFrame::DocumentChanged`] / [`ServerFrame::RecordsChanged`]
//! for live subscriptions.

use serde::{Deserialize, Serialize};

/// Run state of the shared countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStateDto {
    Stopped,
    Running,
    Paused,
}

/// Segment kind (timer mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentKindDto {
    Focus,
    Break,
}

/// Complete document contents as written by a client (no server fields)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFieldsDto {
    pub remaining_seconds: u32,
    pub run_state: RunStateDto,
    pub active_mode: SegmentKindDto,
    pub focus_duration_minutes: u32,
    pub break_duration_minutes: u32,
    pub last_writer: String,
}

/// Shared session document as stored by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocumentDto {
    pub remaining_seconds: u32,
    pub run_state: RunStateDto,
    pub active_mode: SegmentKindDto,
    pub focus_duration_minutes: u32,
    pub break_duration_minutes: u32,
    pub last_writer: String,
    pub write_timestamp: i64,
}

/// Partial update; absent fields are left untouched by the merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatchDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_state: Option<RunStateDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_mode: Option<SegmentKindDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_duration_minutes: Option<u32>,
    pub last_writer: String,
}

/// Record to append (the server assigns `id` and `recordedAt`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSegmentRecordDto {
    pub pairing_key: String,
    pub segment_kind: SegmentKindDto,
    pub duration_minutes: u32,
}

/// Stored segment log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecordDto {
    pub id: String,
    pub pairing_key: String,
    pub recorded_at: i64,
    pub segment_kind: SegmentKindDto,
    pub duration_minutes: u32,
}

/// Frames sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Create the document only if no document exists for `key`
    CreateDocument {
        request_id: u64,
        key: String,
        document: DocumentFieldsDto,
    },
    /// Shallow merge into an existing document
    PatchDocument {
        request_id: u64,
        key: String,
        patch: DocumentPatchDto,
    },
    GetDocument {
        request_id: u64,
        key: String,
    },
    AppendRecord {
        request_id: u64,
        record: NewSegmentRecordDto,
    },
    SubscribeDocument {
        request_id: u64,
        key: String,
    },
    SubscribeRecords {
        request_id: u64,
        key: String,
    },
    Unsubscribe {
        subscription_id: u64,
    },
}

/// Failure category carried by [`ReplyDto::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    NotFound,
    Invalid,
    Internal,
}

/// Result of a single request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ReplyDto {
    Ack,
    Created { created: bool },
    Document { document: Option<SessionDocumentDto> },
    RecordAppended { id: String },
    Subscribed { subscription_id: u64 },
    Failed { code: ErrorCode, message: String },
}

/// Frames sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    Reply {
        request_id: u64,
        result: ReplyDto,
    },
    DocumentChanged {
        subscription_id: u64,
        document: Option<SessionDocumentDto>,
    },
    RecordsChanged {
        subscription_id: u64,
        records: Vec<SegmentRecordDto>,
    },
}

impl ServerFrame {
    /// Shorthand for a failed reply
    pub fn failed(request_id: u64, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Reply {
            request_id,
            result: ReplyDto::Failed {
                code,
                message: message.into(),
            },
        }
    }
}
