//! Conversion logic between protocol DTOs and domain entities.

use tandem_shared::protocol as dto;

use crate::domain::{
    DocumentFields, DocumentKey, DocumentPatch, DomainError, NewSegmentRecord, RunState,
    SegmentKind, SegmentRecord, SessionDocument,
};

// ========================================
// DTO → Domain Entity
// ========================================

impl From<dto::RunStateDto> for RunState {
    fn from(dto: dto::RunStateDto) -> Self {
        match dto {
            dto::RunStateDto::Stopped => Self::Stopped,
            dto::RunStateDto::Running => Self::Running,
            dto::RunStateDto::Paused => Self::Paused,
        }
    }
}

impl From<dto::SegmentKindDto> for SegmentKind {
    fn from(dto: dto::SegmentKindDto) -> Self {
        match dto {
            dto::SegmentKindDto::Focus => Self::Focus,
            dto::SegmentKindDto::Break => Self::Break,
        }
    }
}

impl TryFrom<dto::DocumentFieldsDto> for DocumentFields {
    type Error = DomainError;

    fn try_from(dto: dto::DocumentFieldsDto) -> Result<Self, Self::Error> {
        let fields = Self {
            remaining_seconds: dto.remaining_seconds,
            run_state: dto.run_state.into(),
            active_mode: dto.active_mode.into(),
            focus_duration_minutes: dto.focus_duration_minutes,
            break_duration_minutes: dto.break_duration_minutes,
            last_writer: dto.last_writer,
        };
        fields.validate()?;
        Ok(fields)
    }
}

impl TryFrom<dto::DocumentPatchDto> for DocumentPatch {
    type Error = DomainError;

    fn try_from(dto: dto::DocumentPatchDto) -> Result<Self, Self::Error> {
        let patch = Self {
            remaining_seconds: dto.remaining_seconds,
            run_state: dto.run_state.map(Into::into),
            active_mode: dto.active_mode.map(Into::into),
            focus_duration_minutes: dto.focus_duration_minutes,
            break_duration_minutes: dto.break_duration_minutes,
            last_writer: dto.last_writer,
        };
        patch.validate()?;
        Ok(patch)
    }
}

impl TryFrom<dto::NewSegmentRecordDto> for NewSegmentRecord {
    type Error = DomainError;

    fn try_from(dto: dto::NewSegmentRecordDto) -> Result<Self, Self::Error> {
        NewSegmentRecord::new(
            DocumentKey::new(dto.pairing_key)?,
            dto.segment_kind.into(),
            dto.duration_minutes,
        )
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<RunState> for dto::RunStateDto {
    fn from(model: RunState) -> Self {
        match model {
            RunState::Stopped => Self::Stopped,
            RunState::Running => Self::Running,
            RunState::Paused => Self::Paused,
        }
    }
}

impl From<SegmentKind> for dto::SegmentKindDto {
    fn from(model: SegmentKind) -> Self {
        match model {
            SegmentKind::Focus => Self::Focus,
            SegmentKind::Break => Self::Break,
        }
    }
}

impl From<SessionDocument> for dto::SessionDocumentDto {
    fn from(model: SessionDocument) -> Self {
        Self {
            remaining_seconds: model.remaining_seconds,
            run_state: model.run_state.into(),
            active_mode: model.active_mode.into(),
            focus_duration_minutes: model.focus_duration_minutes,
            break_duration_minutes: model.break_duration_minutes,
            last_writer: model.last_writer,
            write_timestamp: model.write_timestamp.value(),
        }
    }
}

impl From<SegmentRecord> for dto::SegmentRecordDto {
    fn from(model: SegmentRecord) -> Self {
        Self {
            id: model.id.into_string(),
            pairing_key: model.pairing_key.into_string(),
            recorded_at: model.recorded_at.value(),
            segment_kind: model.segment_kind.into(),
            duration_minutes: model.duration_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RecordId, Timestamp};

    #[test]
    fn test_dto_fields_to_domain() {
        // テスト項目: DTO のドキュメントフィールドがドメインに変換される
        // given (前提条件):
        let dto_fields = dto::DocumentFieldsDto {
            remaining_seconds: 1500,
            run_state: dto::RunStateDto::Stopped,
            active_mode: dto::SegmentKindDto::Focus,
            focus_duration_minutes: 25,
            break_duration_minutes: 5,
            last_writer: "ALICE".to_string(),
        };

        // when (操作):
        let fields = DocumentFields::try_from(dto_fields).unwrap();

        // then (期待する結果):
        assert_eq!(fields.run_state, RunState::Stopped);
        assert_eq!(fields.active_mode, SegmentKind::Focus);
        assert_eq!(fields.last_writer, "ALICE");
    }

    #[test]
    fn test_dto_fields_with_zero_break_is_rejected() {
        // テスト項目: 休憩時間 0 分のフィールドは変換時に拒否される
        // given (前提条件):
        let dto_fields = dto::DocumentFieldsDto {
            remaining_seconds: 0,
            run_state: dto::RunStateDto::Stopped,
            active_mode: dto::SegmentKindDto::Break,
            focus_duration_minutes: 25,
            break_duration_minutes: 0,
            last_writer: "ALICE".to_string(),
        };

        // when (操作):
        let result = DocumentFields::try_from(dto_fields);

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(DomainError::InvalidDuration {
                field: "breakDurationMinutes",
                ..
            })
        ));
    }

    #[test]
    fn test_domain_record_to_dto() {
        // テスト項目: ドメインのレコードが DTO に変換される
        // given (前提条件):
        let record = SegmentRecord {
            id: RecordId::generate(),
            pairing_key: DocumentKey::new("ALICE_BOB".to_string()).unwrap(),
            recorded_at: Timestamp::new(42),
            segment_kind: SegmentKind::Break,
            duration_minutes: 5,
        };
        let expected_id = record.id.as_str().to_string();

        // when (操作):
        let dto_record: dto::SegmentRecordDto = record.into();

        // then (期待する結果):
        assert_eq!(dto_record.id, expected_id);
        assert_eq!(dto_record.pairing_key, "ALICE_BOB");
        assert_eq!(dto_record.recorded_at, 42);
        assert_eq!(dto_record.segment_kind, dto::SegmentKindDto::Break);
    }

    #[test]
    fn test_dto_new_record_with_empty_key_is_rejected() {
        // テスト項目: 空のペアリングキーを持つレコードは拒否される
        // given (前提条件):
        let dto_record = dto::NewSegmentRecordDto {
            pairing_key: "".to_string(),
            segment_kind: dto::SegmentKindDto::Focus,
            duration_minutes: 1,
        };

        // when (操作):
        let result = NewSegmentRecord::try_from(dto_record);

        // then (期待する結果):
        assert!(matches!(result, Err(DomainError::InvalidDocumentKey(_))));
    }
}
