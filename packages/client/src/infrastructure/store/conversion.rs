//! Conversion between wire DTOs and client domain types.

use tandem_shared::protocol as dto;

use crate::domain::{
    DocumentSeed, NewSegmentRecord, ParticipantId, RunState, SegmentLogRecord,
    SharedSessionDocument, StatePatch, TimerMode,
};

impl From<dto::RunStateDto> for RunState {
    fn from(dto: dto::RunStateDto) -> Self {
        match dto {
            dto::RunStateDto::Stopped => Self::Stopped,
            dto::RunStateDto::Running => Self::Running,
            dto::RunStateDto::Paused => Self::Paused,
        }
    }
}

impl From<RunState> for dto::RunStateDto {
    fn from(model: RunState) -> Self {
        match model {
            RunState::Stopped => Self::Stopped,
            RunState::Running => Self::Running,
            RunState::Paused => Self::Paused,
        }
    }
}

impl From<dto::SegmentKindDto> for TimerMode {
    fn from(dto: dto::SegmentKindDto) -> Self {
        match dto {
            dto::SegmentKindDto::Focus => Self::Focus,
            dto::SegmentKindDto::Break => Self::Break,
        }
    }
}

impl From<TimerMode> for dto::SegmentKindDto {
    fn from(model: TimerMode) -> Self {
        match model {
            TimerMode::Focus => Self::Focus,
            TimerMode::Break => Self::Break,
        }
    }
}

impl From<dto::SessionDocumentDto> for SharedSessionDocument {
    fn from(dto: dto::SessionDocumentDto) -> Self {
        Self {
            remaining_seconds: dto.remaining_seconds,
            run_state: dto.run_state.into(),
            active_mode: dto.active_mode.into(),
            focus_duration_minutes: dto.focus_duration_minutes,
            break_duration_minutes: dto.break_duration_minutes,
            last_writer: dto.last_writer,
            write_timestamp: dto.write_timestamp,
        }
    }
}

impl From<DocumentSeed> for dto::DocumentFieldsDto {
    fn from(seed: DocumentSeed) -> Self {
        Self {
            remaining_seconds: seed.remaining_seconds,
            run_state: seed.run_state.into(),
            active_mode: seed.active_mode.into(),
            focus_duration_minutes: seed.focus_duration_minutes,
            break_duration_minutes: seed.break_duration_minutes,
            last_writer: seed.last_writer,
        }
    }
}

impl From<dto::SegmentRecordDto> for SegmentLogRecord {
    fn from(dto: dto::SegmentRecordDto) -> Self {
        Self {
            id: dto.id,
            pairing_key: dto.pairing_key,
            recorded_at: dto.recorded_at,
            segment_kind: dto.segment_kind.into(),
            duration_minutes: dto.duration_minutes,
        }
    }
}

impl From<NewSegmentRecord> for dto::NewSegmentRecordDto {
    fn from(record: NewSegmentRecord) -> Self {
        Self {
            pairing_key: record.pairing_key.as_str().to_string(),
            segment_kind: record.segment_kind.into(),
            duration_minutes: record.duration_minutes,
        }
    }
}

pub(super) fn patch_dto(patch: StatePatch, writer: &ParticipantId) -> dto::DocumentPatchDto {
    dto::DocumentPatchDto {
        remaining_seconds: patch.remaining_seconds,
        run_state: patch.run_state.map(Into::into),
        active_mode: patch.active_mode.map(Into::into),
        focus_duration_minutes: patch.focus_duration_minutes,
        break_duration_minutes: patch.break_duration_minutes,
        last_writer: writer.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_dto_carries_writer_and_only_set_fields() {
        // テスト項目: パッチ DTO には書き込み者と指定したフィールドだけが入る
        // given (前提条件):
        let patch = StatePatch::new().run_state(RunState::Paused).remaining(42);
        let writer = ParticipantId::new("bob").unwrap();

        // when (操作):
        let dto = patch_dto(patch, &writer);

        // then (期待する結果):
        assert_eq!(dto.last_writer, "BOB");
        assert_eq!(dto.run_state, Some(dto::RunStateDto::Paused));
        assert_eq!(dto.remaining_seconds, Some(42));
        assert_eq!(dto.active_mode, None);
        assert_eq!(dto.focus_duration_minutes, None);
    }
}
