//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tandem_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::DocumentKey,
    infrastructure::dto::http::{SegmentRecordViewDto, SessionDetailDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get the shared session document for a pairing key
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<SessionDetailDto>, StatusCode> {
    let key = parse_key(key)?;
    let document = state
        .get_document_usecase
        .execute(&key)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    // Domain Model から DTO への変換
    let written_at = timestamp_to_rfc3339(document.write_timestamp.value());
    Ok(Json(SessionDetailDto {
        key: key.into_string(),
        document: document.into(),
        written_at,
    }))
}

/// Get the segment log of a pairing key, newest first
pub async fn get_session_records(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<Vec<SegmentRecordViewDto>>, StatusCode> {
    let key = parse_key(key)?;
    let records = state.get_records_usecase.execute(&key).await;

    // Domain Model から DTO への変換
    let views = records
        .into_iter()
        .map(|record| SegmentRecordViewDto {
            id: record.id.into_string(),
            segment_kind: record.segment_kind.into(),
            duration_minutes: record.duration_minutes,
            recorded_at: timestamp_to_rfc3339(record.recorded_at.value()),
        })
        .collect();
    Ok(Json(views))
}

fn parse_key(raw: String) -> Result<DocumentKey, StatusCode> {
    DocumentKey::new(raw).map_err(|e| {
        tracing::warn!("Rejected HTTP request: {}", e);
        StatusCode::BAD_REQUEST
    })
}
