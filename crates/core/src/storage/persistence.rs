//! Task list persistence
//!
//! Translates the task list to and from a single key-value entry.
//!
//! Written format is a versioned envelope:
//!
//! ```json
//! { "version": 1, "tasks": [ { "id": "...", "title": "...", ... } ] }
//! ```
//!
//! Older builds stored a bare JSON array of tasks, sometimes under the
//! `tareas` key; both are still read. A legacy entry is removed once the
//! list has been saved under the current key.

use serde::Serialize;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::backend::KeyValueStorage;
use crate::task::Task;
use crate::{Error, Result};

/// Key the task list is stored under by default
pub const DEFAULT_KEY: &str = "tasks";

/// Keys consulted, in order, when the primary key is absent
pub const LEGACY_KEYS: &[&str] = &["tareas"];

/// Current envelope version
pub const CURRENT_VERSION: u32 = 1;

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    tasks: &'a [Task],
}

/// Encode a task list in the current stored format
pub fn encode(tasks: &[Task]) -> Result<Vec<u8>> {
    let envelope = Envelope {
        version: CURRENT_VERSION,
        tasks,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Decode either the versioned envelope or a legacy bare array
pub fn decode(bytes: &[u8]) -> Result<Vec<Task>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::StorageRead(format!("Stored task list is not valid JSON: {}", e)))?;

    let tasks = match value {
        Value::Array(_) => value,
        Value::Object(mut obj) => {
            let version = obj
                .get("version")
                .and_then(Value::as_u64)
                .ok_or_else(|| Error::StorageRead("Stored task list has no version".to_string()))?;
            if version > u64::from(CURRENT_VERSION) {
                return Err(Error::StorageRead(format!(
                    "Stored task list version {} is newer than supported version {}",
                    version, CURRENT_VERSION
                )));
            }
            obj.remove("tasks")
                .ok_or_else(|| Error::StorageRead("Stored task list has no tasks".to_string()))?
        }
        other => {
            return Err(Error::StorageRead(format!(
                "Stored task list has unexpected shape: {}",
                json_kind(&other)
            )))
        }
    };

    serde_json::from_value(tasks)
        .map_err(|e| Error::StorageRead(format!("Failed to parse stored tasks: {}", e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loads and saves the task list through a [`KeyValueStorage`]
pub struct TaskPersistence<S> {
    storage: S,
    key: String,
    /// Legacy key the last load read from, removed after the next save
    migrated_from: Mutex<Option<&'static str>>,
}

impl<S: KeyValueStorage> TaskPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            migrated_from: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read the stored list.
    ///
    /// `Ok(None)` means nothing has been stored yet. Unreadable or
    /// undecodable data is an [`Error::StorageRead`].
    pub async fn load(&self) -> Result<Option<Vec<Task>>> {
        let mut found = self.read(&self.key).await?.map(|bytes| (self.key.as_str(), bytes));

        if found.is_none() {
            for legacy in LEGACY_KEYS.iter().copied().filter(|k| *k != self.key) {
                if let Some(bytes) = self.read(legacy).await? {
                    info!("Reading task list from legacy key {:?}", legacy);
                    found = Some((legacy, bytes));
                    break;
                }
            }
        }

        let Some((key, bytes)) = found else {
            debug!("No stored task list under {:?}", self.key);
            return Ok(None);
        };

        let tasks = decode(&bytes).inspect_err(|e| {
            warn!("Stored task list under {:?} is unusable: {}", key, e);
        })?;
        *self.migrated() = LEGACY_KEYS.iter().copied().find(|k| *k == key);
        debug!("Loaded {} tasks from {:?}", tasks.len(), key);
        Ok(Some(tasks))
    }

    /// Overwrite the stored list with `tasks`
    pub async fn save(&self, tasks: &[Task]) -> Result<()> {
        let bytes = encode(tasks)
            .map_err(|e| Error::StorageWrite(format!("Failed to serialize tasks: {}", e)))?;
        self.storage
            .set(&self.key, bytes)
            .await
            .map_err(|e| match e {
                Error::StorageWrite(_) => e,
                other => Error::StorageWrite(other.to_string()),
            })?;
        debug!("Saved {} tasks to {:?}", tasks.len(), self.key);

        let legacy = self.migrated().take();
        if let Some(legacy) = legacy {
            match self.storage.remove(legacy).await {
                Ok(true) => info!("Removed legacy task list under {:?}", legacy),
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to remove legacy task list under {:?}: {}", legacy, e);
                    *self.migrated() = Some(legacy);
                }
            }
        }
        Ok(())
    }

    fn migrated(&self) -> std::sync::MutexGuard<'_, Option<&'static str>> {
        self.migrated_from
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.storage.get(key).await.map_err(|e| match e {
            Error::StorageRead(_) => e,
            other => Error::StorageRead(other.to_string()),
        })
    }
}
