//! エンティティ
//!
//! 共有セッションドキュメントとセグメントログレコード。

use super::{
    error::DomainError,
    value_object::{DocumentKey, RecordId, Timestamp},
};

/// Run state of the shared countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

/// Kind of segment (timer mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Focus,
    Break,
}

/// Full set of client-writable document fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields {
    pub remaining_seconds: u32,
    pub run_state: RunState,
    pub active_mode: SegmentKind,
    pub focus_duration_minutes: u32,
    pub break_duration_minutes: u32,
    pub last_writer: String,
}

impl DocumentFields {
    /// Check the invariants every stored document must satisfy
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_duration("focusDurationMinutes", self.focus_duration_minutes)?;
        validate_duration("breakDurationMinutes", self.break_duration_minutes)?;
        validate_writer(&self.last_writer)
    }
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub remaining_seconds: Option<u32>,
    pub run_state: Option<RunState>,
    pub active_mode: Option<SegmentKind>,
    pub focus_duration_minutes: Option<u32>,
    pub break_duration_minutes: Option<u32>,
    pub last_writer: String,
}

impl DocumentPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(minutes) = self.focus_duration_minutes {
            validate_duration("focusDurationMinutes", minutes)?;
        }
        if let Some(minutes) = self.break_duration_minutes {
            validate_duration("breakDurationMinutes", minutes)?;
        }
        validate_writer(&self.last_writer)
    }
}

/// Shared session document (one per key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDocument {
    pub key: DocumentKey,
    pub remaining_seconds: u32,
    pub run_state: RunState,
    pub active_mode: SegmentKind,
    pub focus_duration_minutes: u32,
    pub break_duration_minutes: u32,
    pub last_writer: String,
    pub write_timestamp: Timestamp,
}

impl SessionDocument {
    /// Build a document from a complete set of fields
    pub fn create(key: DocumentKey, fields: DocumentFields, written_at: Timestamp) -> Self {
        Self {
            key,
            remaining_seconds: fields.remaining_seconds,
            run_state: fields.run_state,
            active_mode: fields.active_mode,
            focus_duration_minutes: fields.focus_duration_minutes,
            break_duration_minutes: fields.break_duration_minutes,
            last_writer: fields.last_writer,
            write_timestamp: written_at,
        }
    }

    /// Shallow merge: fields present in the patch overwrite, the rest survive.
    ///
    /// `last_writer` and `write_timestamp` are always replaced.
    pub fn apply_patch(&mut self, patch: DocumentPatch, written_at: Timestamp) {
        if let Some(remaining_seconds) = patch.remaining_seconds {
            self.remaining_seconds = remaining_seconds;
        }
        if let Some(run_state) = patch.run_state {
            self.run_state = run_state;
        }
        if let Some(active_mode) = patch.active_mode {
            self.active_mode = active_mode;
        }
        if let Some(minutes) = patch.focus_duration_minutes {
            self.focus_duration_minutes = minutes;
        }
        if let Some(minutes) = patch.break_duration_minutes {
            self.break_duration_minutes = minutes;
        }
        self.last_writer = patch.last_writer;
        self.write_timestamp = written_at;
    }
}

/// Record to append to the segment log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSegmentRecord {
    pub pairing_key: DocumentKey,
    pub segment_kind: SegmentKind,
    pub duration_minutes: u32,
}

impl NewSegmentRecord {
    pub fn new(
        pairing_key: DocumentKey,
        segment_kind: SegmentKind,
        duration_minutes: u32,
    ) -> Result<Self, DomainError> {
        if duration_minutes == 0 {
            return Err(DomainError::InvalidDuration {
                field: "durationMinutes",
                value: duration_minutes,
            });
        }
        Ok(Self {
            pairing_key,
            segment_kind,
            duration_minutes,
        })
    }
}

/// Immutable segment log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    pub id: RecordId,
    pub pairing_key: DocumentKey,
    pub recorded_at: Timestamp,
    pub segment_kind: SegmentKind,
    pub duration_minutes: u32,
}

impl SegmentRecord {
    pub fn from_new(record: NewSegmentRecord, id: RecordId, recorded_at: Timestamp) -> Self {
        Self {
            id,
            pairing_key: record.pairing_key,
            recorded_at,
            segment_kind: record.segment_kind,
            duration_minutes: record.duration_minutes,
        }
    }
}

fn validate_duration(field: &'static str, value: u32) -> Result<(), DomainError> {
    if value == 0 {
        return Err(DomainError::InvalidDuration { field, value });
    }
    Ok(())
}

fn validate_writer(writer: &str) -> Result<(), DomainError> {
    if writer.trim().is_empty() {
        return Err(DomainError::MissingWriter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> DocumentKey {
        DocumentKey::new("ALICE_BOB".to_string()).unwrap()
    }

    fn fields() -> DocumentFields {
        DocumentFields {
            remaining_seconds: 1500,
            run_state: RunState::Stopped,
            active_mode: SegmentKind::Focus,
            focus_duration_minutes: 25,
            break_duration_minutes: 5,
            last_writer: "ALICE".to_string(),
        }
    }

    #[test]
    fn test_apply_patch_keeps_untouched_fields() {
        // テスト項目: パッチに含まれないフィールドは保持される（浅いマージ）
        // given (前提条件):
        let mut document = SessionDocument::create(key(), fields(), Timestamp::new(1000));
        let patch = DocumentPatch {
            run_state: Some(RunState::Running),
            last_writer: "BOB".to_string(),
            ..Default::default()
        };

        // when (操作):
        document.apply_patch(patch, Timestamp::new(2000));

        // then (期待する結果):
        assert_eq!(document.run_state, RunState::Running);
        assert_eq!(document.remaining_seconds, 1500);
        assert_eq!(document.active_mode, SegmentKind::Focus);
        assert_eq!(document.last_writer, "BOB");
        assert_eq!(document.write_timestamp, Timestamp::new(2000));
    }

    #[test]
    fn test_disjoint_patches_both_survive() {
        // テスト項目: 重ならないフィールドへの 2 つのパッチは両方とも残る
        // given (前提条件):
        let mut document = SessionDocument::create(key(), fields(), Timestamp::new(1000));
        let from_alice = DocumentPatch {
            run_state: Some(RunState::Paused),
            last_writer: "ALICE".to_string(),
            ..Default::default()
        };
        let from_bob = DocumentPatch {
            break_duration_minutes: Some(10),
            last_writer: "BOB".to_string(),
            ..Default::default()
        };

        // when (操作):
        document.apply_patch(from_alice, Timestamp::new(1001));
        document.apply_patch(from_bob, Timestamp::new(1002));

        // then (期待する結果):
        assert_eq!(document.run_state, RunState::Paused);
        assert_eq!(document.break_duration_minutes, 10);
        assert_eq!(document.last_writer, "BOB");
    }

    #[test]
    fn test_fields_reject_zero_duration() {
        // テスト項目: 0 分の設定値を含むドキュメントは不正と判定される
        // given (前提条件):
        let mut invalid = fields();
        invalid.focus_duration_minutes = 0;

        // when (操作):
        let result = invalid.validate();

        // then (期待する結果):
        assert_eq!(
            result,
            Err(DomainError::InvalidDuration {
                field: "focusDurationMinutes",
                value: 0
            })
        );
    }

    #[test]
    fn test_patch_requires_writer() {
        // テスト項目: lastWriter が空のパッチは不正と判定される
        // given (前提条件):
        let patch = DocumentPatch {
            remaining_seconds: Some(10),
            ..Default::default()
        };

        // when (操作):
        let result = patch.validate();

        // then (期待する結果):
        assert_eq!(result, Err(DomainError::MissingWriter));
    }

    #[test]
    fn test_new_segment_record_rejects_zero_minutes() {
        // テスト項目: 0 分のレコードは作成できない
        // given (前提条件):

        // when (操作):
        let result = NewSegmentRecord::new(key(), SegmentKind::Focus, 0);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
