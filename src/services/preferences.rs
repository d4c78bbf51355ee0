use crate::config::get_data_dir;
use crate::error::StoreError;
use crate::services::PreferenceStore;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Preferences kept as one JSON object in a file under the data directory
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<data dir>/preferences.json`
    pub fn in_data_dir() -> Self {
        Self::new(get_data_dir().join("preferences.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Transport(format!("{}: {e}", self.path.display())))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

impl PreferenceStore for FilePreferences {
    fn read_preference(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(self.load()?.get(key).cloned())
    }

    fn write_preference(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|e| StoreError::Transport(e.to_string()))?;
        let mut all = self.load()?;
        all.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Transport(format!("{}: {e}", parent.display())))?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(all))?;
        std::fs::write(&self.path, body)
            .map_err(|e| StoreError::Transport(format!("{}: {e}", self.path.display())))
    }
}

/// Session-only preferences
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<Map<String, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn read_preference(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.lock().map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn write_preference(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|e| StoreError::Transport(e.to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
