use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Keys persisted by the widget between renders and across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKey {
    DisplayedMonth,
    DisplayedYear,
    SelectedDay,
}

impl StateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::DisplayedMonth => "calendar_widget_month",
            StateKey::DisplayedYear => "calendar_widget_year",
            StateKey::SelectedDay => "calendar_widget_selected_day",
        }
    }
}

/// Narrow key-value port for navigation state. Writes overwrite; the last writer wins.
pub trait StateStore: Send + Sync {
    fn get(&self, key: StateKey) -> Result<Option<i32>, StoreError>;

    fn set(&self, key: StateKey, value: i32) -> Result<(), StoreError>;

    fn contains(&self, key: StateKey) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }

    /// Reads `key`, answering `default` when it is absent or unreadable.
    fn get_int(&self, key: StateKey, default: i32) -> i32 {
        match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                tracing::warn!(key = key.as_str(), %err, "state read failed, using default");
                default
            }
        }
    }

    fn set_many(&self, entries: &[(StateKey, i32)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(*key, *value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<StateKey, i32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(entries: &[(StateKey, i32)]) -> Self {
        let store = Self::new();
        store.values.write().extend(entries.iter().copied());
        store
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: StateKey) -> Result<Option<i32>, StoreError> {
        Ok(self.values.read().get(&key).copied())
    }

    fn set(&self, key: StateKey, value: i32) -> Result<(), StoreError> {
        self.values.write().insert(key, value);
        Ok(())
    }
}

/// Stores the state as a flat JSON object and rewrites the file on every write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, i32>>,
}

impl JsonFileStore {
    /// Opens `path`. A missing file starts empty; an unreadable or corrupt one is
    /// logged and also starts empty, so the widget falls back to the current date.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match Self::read(&path) {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(%err, "discarding persisted widget state");
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    fn read(path: &Path) -> Result<BTreeMap<String, i32>, StoreError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write(&self, values: &BTreeMap<String, i32>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let payload = serde_json::to_string_pretty(values).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, payload).map_err(io_err)?;
        fs::rename(&staging, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: StateKey) -> Result<Option<i32>, StoreError> {
        Ok(self.values.read().get(key.as_str()).copied())
    }

    fn set(&self, key: StateKey, value: i32) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&self, entries: &[(StateKey, i32)]) -> Result<(), StoreError> {
        let mut values = self.values.write();
        let mut staged = values.clone();
        for (key, value) in entries {
            staged.insert(key.as_str().to_string(), *value);
        }
        self.write(&staged)?;
        *values = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn get_int_falls_back_to_default() {
        let store = MemoryStore::new();
        assert_eq!(store.get_int(StateKey::SelectedDay, 7), 7);
        store.set(StateKey::SelectedDay, 3).unwrap();
        assert_eq!(store.get_int(StateKey::SelectedDay, 7), 3);
        assert!(store.contains(StateKey::SelectedDay));
        assert!(!store.contains(StateKey::DisplayedMonth));
    }

    #[test]
    fn json_store_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("state").join("widget.json");
        let store = JsonFileStore::open(&path);
        store
            .set_many(&[(StateKey::DisplayedMonth, 3), (StateKey::DisplayedYear, 2024)])
            .unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(StateKey::DisplayedMonth).unwrap(), Some(3));
        assert_eq!(reopened.get(StateKey::DisplayedYear).unwrap(), Some(2024));
        assert_eq!(reopened.get(StateKey::SelectedDay).unwrap(), None);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("calendar_widget_month"));
    }

    #[test]
    fn corrupt_json_starts_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("widget.json");
        fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert!(!store.contains(StateKey::DisplayedMonth));
        store.set(StateKey::SelectedDay, 12).unwrap();
        assert_eq!(JsonFileStore::open(&path).get_int(StateKey::SelectedDay, 0), 12);
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = JsonFileStore::open(blocker.join("widget.json"));

        assert!(store.set(StateKey::SelectedDay, 12).is_err());
        assert_eq!(store.get(StateKey::SelectedDay).unwrap(), None);
        assert!(!store.contains(StateKey::SelectedDay));
    }
}
