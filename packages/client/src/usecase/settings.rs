//! Settings propagator
//!
//! Durations are validated, persisted device-locally and applied to the
//! local timer first; the shared document is updated only while paired.

use std::sync::Arc;

use crate::domain::{
    Durations, Notice, Notifier, PreferenceKey, PreferenceStore, StatePatch, TimerState,
    ValidationError,
};

use super::synchronizer::{SyncContext, SyncOutcome, Synchronizer};

#[derive(Clone)]
pub struct SettingsPropagator {
    preferences: Arc<dyn PreferenceStore>,
    synchronizer: Synchronizer,
    notifier: Arc<dyn Notifier>,
}

impl SettingsPropagator {
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        synchronizer: Synchronizer,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            preferences,
            synchronizer,
            notifier,
        }
    }

    /// Validate and apply new durations to `timer`.
    ///
    /// Returns the patch to share: both durations and the (possibly reflowed)
    /// remaining time. Nothing is mutated when validation fails.
    pub fn apply_locally(
        &self,
        timer: &mut TimerState,
        focus_minutes: u32,
        break_minutes: u32,
    ) -> Result<StatePatch, ValidationError> {
        let durations = match Durations::new(focus_minutes, break_minutes) {
            Ok(durations) => durations,
            Err(e) => {
                self.notifier
                    .notify(Notice::destructive("Invalid Settings", e.to_string()));
                return Err(e);
            }
        };

        self.persist(&durations);
        timer.apply_durations(durations);

        Ok(StatePatch::new()
            .durations(&durations)
            .remaining(timer.remaining_seconds))
    }

    /// Share `patch` when paired; otherwise report a local-only update
    pub async fn propagate(
        &self,
        context: Option<&SyncContext>,
        patch: StatePatch,
        local: &TimerState,
    ) -> Option<SyncOutcome> {
        let Some(context) = context else {
            self.notifier.notify(Notice::info(
                "Local Settings Updated!",
                "Connect with your partner to sync them.",
            ));
            return None;
        };

        let outcome = self.synchronizer.push(context, patch, local).await;
        if outcome != SyncOutcome::Failed {
            self.notifier.notify(Notice::info(
                "Settings Synced",
                "Durations are updated for both of us.",
            ));
        }
        Some(outcome)
    }

    fn persist(&self, durations: &Durations) {
        let writes = [
            (PreferenceKey::FocusDurationMinutes, durations.focus_minutes()),
            (PreferenceKey::BreakDurationMinutes, durations.break_minutes()),
        ];
        for (key, minutes) in writes {
            if let Err(e) = self.preferences.set(key, &minutes.to_string()) {
                tracing::warn!("Failed to persist {}: {}", key.as_str(), e);
            }
        }
    }
}
