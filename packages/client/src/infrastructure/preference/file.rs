//! JSON file preference store.
//!
//! Values are kept in memory and the whole map is rewritten on every change.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use crate::domain::{PreferenceError, PreferenceKey, PreferenceStore};

pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFilePreferenceStore {
    /// Load preferences from `path`; a missing or unreadable file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(
                    "Ignoring malformed preferences at {}: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), PreferenceError> {
        let io_error = |source| PreferenceError::Io {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, contents).map_err(io_error)
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: PreferenceKey) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key.as_str()).cloned()
    }

    fn set(&self, key: PreferenceKey, value: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.as_str().to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: PreferenceKey) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key.as_str()).is_none() {
            return Ok(());
        }
        self.persist(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tandem-prefs-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_values_survive_reopen() {
        // テスト項目: 保存した値がファイルから再読み込みされる
        // given (前提条件):
        let path = temp_path("prefs.json");
        let store = JsonFilePreferenceStore::open(&path);

        // when (操作):
        store.set(PreferenceKey::SelfId, "ALICE").unwrap();
        store.set(PreferenceKey::PartnerId, "BOB").unwrap();
        store.remove(PreferenceKey::PartnerId).unwrap();
        let reopened = JsonFilePreferenceStore::open(&path);

        // then (期待する結果):
        assert_eq!(reopened.get(PreferenceKey::SelfId), Some("ALICE".to_string()));
        assert_eq!(reopened.get(PreferenceKey::PartnerId), None);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_file_starts_empty() {
        // テスト項目: 壊れたファイルは無視され、空の状態から始まる
        // given (前提条件):
        let path = temp_path("prefs.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        // when (操作):
        let store = JsonFilePreferenceStore::open(&path);

        // then (期待する結果):
        assert_eq!(store.get(PreferenceKey::FocusDurationMinutes), None);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
