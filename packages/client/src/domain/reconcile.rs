//! Reconciliation of remote document updates with the local timer.
//!
//! Every update delivered by the document subscription is classified into a
//! [`DocumentChange`] and then handed to [`reduce`], the only place that lets
//! remote state into the local mirror.
//!
//! | Origin | Meaning | Effect |
//! |---|---|---|
//! | `Hydration` | first snapshot after subscribing | mirrored |
//! | `SelfEcho` | `lastWriter` is this participant | ignored |
//! | `Partner` | written by the other participant | mirrored |

use super::{Durations, ParticipantId, RunState, SharedSessionDocument, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Hydration,
    SelfEcho,
    Partner,
}

/// Contested document field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentField {
    RemainingSeconds,
    RunState,
    ActiveMode,
    FocusDuration,
    BreakDuration,
}

/// One classified remote update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub origin: Origin,
    /// Fields that differ from the previously observed document (all of them if none)
    pub changed: Vec<DocumentField>,
    pub document: SharedSessionDocument,
}

impl DocumentChange {
    pub fn classify(
        self_id: &ParticipantId,
        previous: Option<&SharedSessionDocument>,
        document: SharedSessionDocument,
        hydrated: bool,
    ) -> Self {
        let origin = if !hydrated {
            Origin::Hydration
        } else if document.last_writer == self_id.as_str() {
            Origin::SelfEcho
        } else {
            Origin::Partner
        };

        Self {
            origin,
            changed: changed_fields(previous, &document),
            document,
        }
    }
}

fn changed_fields(
    previous: Option<&SharedSessionDocument>,
    current: &SharedSessionDocument,
) -> Vec<DocumentField> {
    let Some(previous) = previous else {
        return vec![
            DocumentField::RemainingSeconds,
            DocumentField::RunState,
            DocumentField::ActiveMode,
            DocumentField::FocusDuration,
            DocumentField::BreakDuration,
        ];
    };

    let mut changed = Vec::new();
    if previous.remaining_seconds != current.remaining_seconds {
        changed.push(DocumentField::RemainingSeconds);
    }
    if previous.run_state != current.run_state {
        changed.push(DocumentField::RunState);
    }
    if previous.active_mode != current.active_mode {
        changed.push(DocumentField::ActiveMode);
    }
    if previous.focus_duration_minutes != current.focus_duration_minutes {
        changed.push(DocumentField::FocusDuration);
    }
    if previous.break_duration_minutes != current.break_duration_minutes {
        changed.push(DocumentField::BreakDuration);
    }
    changed
}

/// Per-subscription classification state
#[derive(Debug, Clone)]
pub struct DocumentTracker {
    self_id: ParticipantId,
    previous: Option<SharedSessionDocument>,
    hydrated: bool,
}

impl DocumentTracker {
    pub fn new(self_id: ParticipantId) -> Self {
        Self {
            self_id,
            previous: None,
            hydrated: false,
        }
    }

    /// The subscription reported the document as absent.
    ///
    /// An absent first snapshot still counts as hydration, so the echo of a
    /// document this client creates afterwards is treated as its own write.
    pub fn observe_missing(&mut self) {
        self.previous = None;
        self.hydrated = true;
    }

    pub fn observe(&mut self, document: SharedSessionDocument) -> DocumentChange {
        let change = DocumentChange::classify(
            &self.self_id,
            self.previous.as_ref(),
            document,
            self.hydrated,
        );
        self.previous = Some(change.document.clone());
        self.hydrated = true;
        change
    }
}

/// Outcome of [`reduce`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Ignored,
    Mirrored,
}

/// Apply a classified change to the local timer
pub fn reduce(timer: &mut TimerState, change: &DocumentChange) -> Reduction {
    match change.origin {
        Origin::SelfEcho => {
            tracing::debug!(
                "Ignoring self echo written at {}",
                change.document.write_timestamp
            );
            Reduction::Ignored
        }
        Origin::Hydration | Origin::Partner => {
            tracing::debug!(
                "Mirroring {:?} update from '{}' (changed: {:?})",
                change.origin,
                change.document.last_writer,
                change.changed
            );
            mirror(timer, &change.document);
            Reduction::Mirrored
        }
    }
}

fn mirror(timer: &mut TimerState, document: &SharedSessionDocument) {
    let durations = Durations::new(
        document.focus_duration_minutes,
        document.break_duration_minutes,
    )
    .unwrap_or(timer.durations);

    let budget = if document.run_state == RunState::Stopped {
        document.remaining_seconds
    } else if document.active_mode != timer.active_mode || timer.run_state == RunState::Stopped {
        durations.seconds_for(document.active_mode)
    } else {
        timer.segment_start_budget.max(document.remaining_seconds)
    };

    timer.durations = durations;
    timer.active_mode = document.active_mode;
    timer.run_state = document.run_state;
    timer.remaining_seconds = document.remaining_seconds;
    timer.segment_start_budget = budget;
}
