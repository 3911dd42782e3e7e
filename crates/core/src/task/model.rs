//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Error, Result};

/// Opaque task identifier
///
/// Fresh ids are UUID v4 text; ids read back from older data (millisecond
/// timestamps) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single to-do item
///
/// Records written by the Spanish-language build of the app used
/// `titulo`/`descripcion`/`completada`/`creadaEn`; those names are still
/// accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(alias = "titulo")]
    pub title: String,
    #[serde(default, alias = "descripcion")]
    pub description: String,
    #[serde(default, alias = "completada")]
    pub completed: bool,
    #[serde(alias = "creadaEn")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: String::new(),
            completed: false,
            created_at: Utc::now(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the id
    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }
}

/// Length limits applied to user-entered text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLimits {
    pub title_max_chars: usize,
    pub description_max_chars: usize,
}

impl Default for TaskLimits {
    fn default() -> Self {
        Self {
            title_max_chars: 50,
            description_max_chars: 200,
        }
    }
}

impl TaskLimits {
    /// Trim and validate a title/description pair.
    ///
    /// Returns the trimmed values. Lengths are counted in chars, after
    /// trimming.
    pub fn validate(&self, title: &str, description: &str) -> Result<(String, String)> {
        let title = title.trim();
        let description = description.trim();

        if title.is_empty() {
            return Err(Error::Validation("Title must not be empty".to_string()));
        }
        let title_len = title.chars().count();
        if title_len > self.title_max_chars {
            return Err(Error::Validation(format!(
                "Title is {} characters, at most {} allowed",
                title_len, self.title_max_chars
            )));
        }
        let description_len = description.chars().count();
        if description_len > self.description_max_chars {
            return Err(Error::Validation(format!(
                "Description is {} characters, at most {} allowed",
                description_len, self.description_max_chars
            )));
        }

        Ok((title.to_string(), description.to_string()))
    }
}

/// Derived counts over a task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }
}
