//! Session log recorder
//!
//! Appends one record per finished or aborted segment. A failed append only
//! raises a notice; the timer is never rolled back.

use std::sync::Arc;

use crate::domain::{
    NewSegmentRecord, Notice, Notifier, PairingKey, RemoteStore, TimerMode, rounded_minutes,
};

/// Why nothing was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoElapsedTime,
    Unpaired,
    /// Less than 30 seconds elapsed
    RoundsToZero,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded(String),
    Skipped(SkipReason),
    Failed,
}

#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
}

impl Recorder {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn record(
        &self,
        segment_kind: TimerMode,
        elapsed_seconds: u32,
        pairing_key: Option<&PairingKey>,
    ) -> RecordOutcome {
        let skip = |reason: SkipReason| {
            tracing::debug!(
                "Not recording {:?} segment of {}s: {:?}",
                segment_kind,
                elapsed_seconds,
                reason
            );
            RecordOutcome::Skipped(reason)
        };

        if elapsed_seconds == 0 {
            return skip(SkipReason::NoElapsedTime);
        }
        let Some(pairing_key) = pairing_key else {
            return skip(SkipReason::Unpaired);
        };
        let duration_minutes = rounded_minutes(elapsed_seconds);
        if duration_minutes == 0 {
            return skip(SkipReason::RoundsToZero);
        }

        let record = NewSegmentRecord {
            pairing_key: pairing_key.clone(),
            segment_kind,
            duration_minutes,
        };
        match self.store.append_record(record).await {
            Ok(id) => {
                tracing::info!(
                    "Recorded {} min of {:?} for '{}' ({})",
                    duration_minutes,
                    segment_kind,
                    pairing_key,
                    id
                );
                RecordOutcome::Recorded(id)
            }
            Err(e) => {
                tracing::warn!("Failed to append log record for '{}': {}", pairing_key, e);
                self.notifier.notify(Notice::destructive(
                    "Log Error",
                    "Could not save your session to our journal.",
                ));
                RecordOutcome::Failed
            }
        }
    }
}
