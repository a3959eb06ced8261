//! Device-local preferences.

#[cfg(test)]
use mockall::automock;

use super::{Durations, PreferenceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    SelfId,
    PartnerId,
    FocusDurationMinutes,
    BreakDurationMinutes,
}

impl PreferenceKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfId => "selfId",
            Self::PartnerId => "partnerId",
            Self::FocusDurationMinutes => "focusDurationMinutes",
            Self::BreakDurationMinutes => "breakDurationMinutes",
        }
    }
}

#[cfg_attr(test, automock)]
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: PreferenceKey) -> Option<String>;

    fn set(&self, key: PreferenceKey, value: &str) -> Result<(), PreferenceError>;

    fn remove(&self, key: PreferenceKey) -> Result<(), PreferenceError>;
}

/// Stored durations; missing or unparsable values fall back to the defaults
pub fn load_durations(store: &dyn PreferenceStore) -> Durations {
    let defaults = Durations::default();
    let read = |key: PreferenceKey, fallback: u32| {
        store
            .get(key)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|minutes| *minutes >= 1)
            .unwrap_or(fallback)
    };

    let focus = read(PreferenceKey::FocusDurationMinutes, defaults.focus_minutes());
    let brk = read(PreferenceKey::BreakDurationMinutes, defaults.break_minutes());
    Durations::new(focus, brk).unwrap_or(defaults)
}
