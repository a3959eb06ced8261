use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use crate::domain::{PreferenceError, PreferenceKey, PreferenceStore};

/// Process-local preferences (tests, throwaway sessions)
#[derive(Default)]
pub struct InMemoryPreferenceStore {
    values: Mutex<HashMap<&'static str, String>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: PreferenceKey) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key.as_str()).cloned()
    }

    fn set(&self, key: PreferenceKey, value: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.as_str(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: PreferenceKey) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key.as_str());
        Ok(())
    }
}
