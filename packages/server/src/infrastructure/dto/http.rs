//! HTTP API response DTOs.

use serde::Serialize;
use tandem_shared::protocol::{SegmentKindDto, SessionDocumentDto};

/// `GET /api/sessions/{key}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetailDto {
    pub key: String,
    pub document: SessionDocumentDto,
    /// `writeTimestamp` as RFC 3339
    pub written_at: String,
}

/// One row of `GET /api/sessions/{key}/records`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecordViewDto {
    pub id: String,
    pub segment_kind: SegmentKindDto,
    pub duration_minutes: u32,
    /// `recordedAt` as RFC 3339
    pub recorded_at: String,
}
