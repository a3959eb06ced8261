//! Shared session document as seen by a client.

use super::{Durations, ParticipantId, RunState, TimerMode, TimerState};

/// Stored document (one per pairing key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSessionDocument {
    pub remaining_seconds: u32,
    pub run_state: RunState,
    pub active_mode: TimerMode,
    pub focus_duration_minutes: u32,
    pub break_duration_minutes: u32,
    pub last_writer: String,
    /// Store-assigned, strictly increasing per store (ms since epoch)
    pub write_timestamp: i64,
}

/// Complete document contents written when creating a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSeed {
    pub remaining_seconds: u32,
    pub run_state: RunState,
    pub active_mode: TimerMode,
    pub focus_duration_minutes: u32,
    pub break_duration_minutes: u32,
    pub last_writer: String,
}

impl DocumentSeed {
    /// Stopped focus segment at full length
    pub fn initial(durations: &Durations, writer: &ParticipantId) -> Self {
        Self {
            remaining_seconds: durations.seconds_for(TimerMode::Focus),
            run_state: RunState::Stopped,
            active_mode: TimerMode::Focus,
            focus_duration_minutes: durations.focus_minutes(),
            break_duration_minutes: durations.break_minutes(),
            last_writer: writer.as_str().to_string(),
        }
    }
}

/// Fields of a write; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub remaining_seconds: Option<u32>,
    pub run_state: Option<RunState>,
    pub active_mode: Option<TimerMode>,
    pub focus_duration_minutes: Option<u32>,
    pub break_duration_minutes: Option<u32>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remaining(mut self, seconds: u32) -> Self {
        self.remaining_seconds = Some(seconds);
        self
    }

    pub fn run_state(mut self, run_state: RunState) -> Self {
        self.run_state = Some(run_state);
        self
    }

    pub fn mode(mut self, mode: TimerMode) -> Self {
        self.active_mode = Some(mode);
        self
    }

    pub fn durations(mut self, durations: &Durations) -> Self {
        self.focus_duration_minutes = Some(durations.focus_minutes());
        self.break_duration_minutes = Some(durations.break_minutes());
        self
    }

    /// Union of this patch and the local state, used to re-create a lost document
    pub fn complete_with(&self, local: &TimerState, writer: &ParticipantId) -> DocumentSeed {
        DocumentSeed {
            remaining_seconds: self.remaining_seconds.unwrap_or(local.remaining_seconds),
            run_state: self.run_state.unwrap_or(local.run_state),
            active_mode: self.active_mode.unwrap_or(local.active_mode),
            focus_duration_minutes: self
                .focus_duration_minutes
                .unwrap_or(local.durations.focus_minutes()),
            break_duration_minutes: self
                .break_duration_minutes
                .unwrap_or(local.durations.break_minutes()),
            last_writer: writer.as_str().to_string(),
        }
    }
}
