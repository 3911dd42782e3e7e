//! Store configuration
//!
//! Defaults can be overridden through environment variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `TASKLIST_DATA_DIR` | `.tasklist-data` |
//! | `TASKLIST_STORAGE_KEY` | `tasks` |
//! | `TASKLIST_TITLE_MAX_CHARS` | `50` |
//! | `TASKLIST_DESCRIPTION_MAX_CHARS` | `200` |

use std::path::PathBuf;
use tracing::info;

use crate::storage::{FileStorage, TaskPersistence, DEFAULT_KEY};
use crate::sync::Autosave;
use crate::task::{TaskLimits, TaskStore};
use crate::{Error, Result};

pub const DATA_DIR_VAR: &str = "TASKLIST_DATA_DIR";
pub const STORAGE_KEY_VAR: &str = "TASKLIST_STORAGE_KEY";
pub const TITLE_MAX_VAR: &str = "TASKLIST_TITLE_MAX_CHARS";
pub const DESCRIPTION_MAX_VAR: &str = "TASKLIST_DESCRIPTION_MAX_CHARS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub limits: TaskLimits,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".tasklist-data"),
            storage_key: DEFAULT_KEY.to_string(),
            limits: TaskLimits::default(),
        }
    }
}

impl StoreConfig {
    /// Build a config from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let data_dir = non_empty(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let storage_key = non_empty(STORAGE_KEY_VAR).unwrap_or(defaults.storage_key);
        let limits = TaskLimits {
            title_max_chars: parse_limit(TITLE_MAX_VAR, non_empty(TITLE_MAX_VAR))?
                .unwrap_or(defaults.limits.title_max_chars),
            description_max_chars: parse_limit(DESCRIPTION_MAX_VAR, non_empty(DESCRIPTION_MAX_VAR))?
                .unwrap_or(defaults.limits.description_max_chars),
        };

        Ok(Self {
            data_dir,
            storage_key,
            limits,
        })
    }

    pub fn open_file_storage(&self) -> FileStorage {
        FileStorage::new(self.data_dir.clone())
    }

    pub fn persistence(&self) -> TaskPersistence<FileStorage> {
        TaskPersistence::with_key(self.open_file_storage(), self.storage_key.clone())
    }

    pub fn new_store(&self) -> TaskStore {
        TaskStore::with_limits(self.limits)
    }

    /// Create a store, load it from the data directory and keep it saved
    pub async fn start(&self) -> Autosave {
        info!("Using data directory: {:?}", self.data_dir);
        Autosave::start(self.new_store(), self.persistence()).await
    }
}

fn parse_limit(name: &str, raw: Option<String>) -> Result<Option<usize>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<usize>() {
        Ok(0) => Err(Error::Config(format!("{} must be greater than zero", name))),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(Error::Config(format!("{}={:?}: {}", name, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.storage_key, "tasks");
        assert_eq!(config.limits.title_max_chars, 50);
        assert_eq!(config.limits.description_max_chars, 200);
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            (DATA_DIR_VAR, "/tmp/tasks"),
            (STORAGE_KEY_VAR, "work"),
            (TITLE_MAX_VAR, "80"),
            (DESCRIPTION_MAX_VAR, " 500 "),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/tasks"));
        assert_eq!(config.storage_key, "work");
        assert_eq!(config.limits.title_max_chars, 80);
        assert_eq!(config.limits.description_max_chars, 500);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[(STORAGE_KEY_VAR, "  ")])).unwrap();
        assert_eq!(config.storage_key, DEFAULT_KEY);
    }

    #[test]
    fn test_bad_limits_rejected() {
        for value in ["abc", "-1", "0"] {
            match StoreConfig::from_lookup(lookup(&[(TITLE_MAX_VAR, value)])) {
                Err(Error::Config(msg)) => assert!(msg.contains(TITLE_MAX_VAR)),
                other => panic!("Expected Config error for {:?}, got: {:?}", value, other),
            }
        }
    }

    #[tokio::test]
    async fn test_start_uses_data_dir_and_limits() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            data_dir: temp_dir.path().join("nested"),
            storage_key: "tasks".to_string(),
            limits: TaskLimits {
                title_max_chars: 4,
                description_max_chars: 10,
            },
        };

        let autosave = config.start().await;
        assert!(autosave.store().create("Too long", "").is_err());
        autosave.store().create("Ok", "").unwrap();
        autosave.shutdown().await;

        assert!(temp_dir.path().join("nested").join("tasks.json").exists());
        let reloaded = config.persistence().load().await.unwrap().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].title, "Ok");
    }
}
