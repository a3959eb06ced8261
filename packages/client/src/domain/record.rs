//! Segment log records.

use super::{PairingKey, TimerMode};

/// Stored, immutable log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLogRecord {
    pub id: String,
    pub pairing_key: String,
    /// Store timestamp (ms since epoch)
    pub recorded_at: i64,
    pub segment_kind: TimerMode,
    pub duration_minutes: u32,
}

/// Record to append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSegmentRecord {
    pub pairing_key: PairingKey,
    pub segment_kind: TimerMode,
    pub duration_minutes: u32,
}

/// Whole minutes of `elapsed_seconds`, half rounding up
pub fn rounded_minutes(elapsed_seconds: u32) -> u32 {
    elapsed_seconds.saturating_add(30) / 60
}
