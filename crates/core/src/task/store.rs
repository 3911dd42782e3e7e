//! In-memory task store
//!
//! Single source of truth for the task list. Every mutation is validated,
//! applied through the reducer, bumps the revision and notifies
//! subscribers; [`TaskStore::dispatch`] is the raw action entry point. The store never touches storage itself; see
//! [`crate::sync`] for the autosave side.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::action::{reduce, TaskAction};
use super::model::{Task, TaskLimits, TaskStats};
use crate::Result;

/// Lifecycle of a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorePhase {
    Uninitialized,
    Loading,
    Ready,
}

/// What subscribers observe after every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub phase: StorePhase,
    /// Incremented on every effective change of `tasks`
    pub revision: u64,
    pub tasks: Vec<Task>,
}

/// Result of [`TaskStore::hydrate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hydrated {
    /// Actions dispatched while loading and replayed on top of the loaded
    /// list
    pub replayed: usize,
    /// Revision of the snapshot that made the store ready
    pub revision: u64,
}

/// Handle returned by [`TaskStore::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&[Task]) + Send + Sync>;

struct StoreInner {
    state: watch::Sender<TaskSnapshot>,
    /// Actions dispatched while loading, replayed on hydrate
    pending: Mutex<Vec<TaskAction>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    limits: TaskLimits,
}

/// Cheaply cloneable handle to the task list
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<StoreInner>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Create an empty, uninitialized store with default limits
    pub fn new() -> Self {
        Self::with_limits(TaskLimits::default())
    }

    pub fn with_limits(limits: TaskLimits) -> Self {
        let (state, _) = watch::channel(TaskSnapshot {
            phase: StorePhase::Uninitialized,
            revision: 0,
            tasks: Vec::new(),
        });

        Self {
            inner: Arc::new(StoreInner {
                state,
                pending: Mutex::new(Vec::new()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                limits,
            }),
        }
    }

    pub fn limits(&self) -> TaskLimits {
        self.inner.limits
    }

    pub fn phase(&self) -> StorePhase {
        self.inner.state.borrow().phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == StorePhase::Ready
    }

    pub fn revision(&self) -> u64 {
        self.inner.state.borrow().revision
    }

    /// Current tasks, most recently created first
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.state.borrow().tasks.clone()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn find_by_id(&self, id: &str) -> Option<Task> {
        self.inner
            .state
            .borrow()
            .tasks
            .iter()
            .find(|t| t.id.as_str() == id)
            .cloned()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.inner.state.borrow().tasks)
    }

    /// Create a task and put it at the front of the list
    pub fn create(&self, title: &str, description: &str) -> Result<Task> {
        let (title, description) = self.inner.limits.validate(title, description)?;
        let task = Task::new(title).with_description(description);
        self.apply(TaskAction::Create(task.clone()));
        Ok(task)
    }

    /// Flip the completed flag. Returns `false` if no task has this id.
    pub fn toggle_completed(&self, id: &str) -> bool {
        self.apply(TaskAction::ToggleCompleted { id: id.into() })
    }

    /// Remove a task. Returns `false` if no task has this id.
    pub fn delete(&self, id: &str) -> bool {
        self.apply(TaskAction::Delete { id: id.into() })
    }

    /// Replace title and description.
    ///
    /// Input is validated before the lookup, so a blank title is rejected
    /// even for an unknown id. Returns `Ok(false)` if no task has this id.
    pub fn edit(&self, id: &str, title: &str, description: &str) -> Result<bool> {
        let (title, description) = self.inner.limits.validate(title, description)?;
        Ok(self.apply(TaskAction::Edit {
            id: id.into(),
            title,
            description,
        }))
    }

    /// Validate an action and apply it through the reducer.
    ///
    /// `Create` and `Edit` text goes through the same trimming and limits as
    /// [`TaskStore::create`]/[`TaskStore::edit`]; a rejected action leaves
    /// the list untouched. Returns whether the visible list changed.
    pub fn dispatch(&self, action: TaskAction) -> Result<bool> {
        let action = self.validated(action)?;
        Ok(self.apply(action))
    }

    fn validated(&self, action: TaskAction) -> Result<TaskAction> {
        let limits = &self.inner.limits;
        Ok(match action {
            TaskAction::Create(mut task) => {
                let (title, description) = limits.validate(&task.title, &task.description)?;
                task.title = title;
                task.description = description;
                TaskAction::Create(task)
            }
            TaskAction::Edit {
                id,
                title,
                description,
            } => {
                let (title, description) = limits.validate(&title, &description)?;
                TaskAction::Edit {
                    id,
                    title,
                    description,
                }
            }
            other => other,
        })
    }

    /// Apply an already validated action.
    ///
    /// While `Loading` the action is also journaled so that
    /// [`TaskStore::hydrate`] can replay it on top of the loaded list.
    fn apply(&self, action: TaskAction) -> bool {
        let kind = action.kind();
        let changed = self.inner.state.send_if_modified(|snapshot| {
            if snapshot.phase == StorePhase::Loading {
                self.pending().push(action.clone());
            }
            match reduce(&snapshot.tasks, &action) {
                Some(next) => {
                    snapshot.tasks = next;
                    snapshot.revision += 1;
                    true
                }
                None => false,
            }
        });

        if changed {
            debug!(action = kind, revision = self.revision(), "Task list updated");
            self.notify_listeners();
        } else {
            debug!(action = kind, "Action left task list unchanged");
        }
        changed
    }

    /// Move from `Uninitialized` to `Loading`.
    ///
    /// Returns `false` if the store already left `Uninitialized`.
    pub fn begin_loading(&self) -> bool {
        let started = self.inner.state.send_if_modified(|snapshot| {
            if snapshot.phase != StorePhase::Uninitialized {
                return false;
            }
            snapshot.phase = StorePhase::Loading;
            true
        });
        if started {
            debug!("Task store loading");
        }
        started
    }

    /// Install the loaded list and mark the store ready.
    ///
    /// Actions dispatched while `Loading` are replayed in order on top of
    /// `loaded`. Changes made while still `Uninitialized` are not journaled
    /// and are replaced by `loaded`. Duplicate ids in `loaded` keep their
    /// first occurrence.
    pub fn hydrate(&self, loaded: Vec<Task>) -> Hydrated {
        let mut replayed = 0;
        let mut revision = 0;
        let mut dropped = 0;

        self.inner.state.send_modify(|snapshot| {
            if snapshot.phase == StorePhase::Ready {
                warn!("Hydrating a store that is already ready; replacing its tasks");
            }

            let mut tasks: Vec<Task> = Vec::with_capacity(loaded.len());
            for task in loaded {
                if tasks.iter().any(|t| t.id == task.id) {
                    dropped += 1;
                    continue;
                }
                tasks.push(task);
            }

            let pending = std::mem::take(&mut *self.pending());
            replayed = pending.len();
            for action in &pending {
                if let Some(next) = reduce(&tasks, action) {
                    tasks = next;
                }
            }

            snapshot.tasks = tasks;
            snapshot.phase = StorePhase::Ready;
            snapshot.revision += 1;
            revision = snapshot.revision;
        });

        if dropped > 0 {
            warn!("Dropped {} loaded tasks with duplicate ids", dropped);
        }
        info!(
            tasks = self.inner.state.borrow().tasks.len(),
            replayed, "Task store ready"
        );
        self.notify_listeners();
        Hydrated { replayed, revision }
    }

    /// Latest-value subscription; intermediate states may be skipped
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.inner.state.subscribe()
    }

    /// Register a callback invoked with the new list after every change.
    ///
    /// Callbacks run on the mutating thread, outside any store lock, so they
    /// may read from or dispatch to the store.
    pub fn on_change<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&[Task]) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners().push((id, Arc::new(callback)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn notify_listeners(&self) {
        let listeners: Vec<Listener> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        if listeners.is_empty() {
            return;
        }

        let tasks = self.tasks();
        for listener in listeners {
            listener(&tasks);
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Vec<TaskAction>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
