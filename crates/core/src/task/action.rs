//! Task list actions and the reducer that applies them

use super::model::{Task, TaskId};

/// A single mutation of the task list
///
/// `Create` carries the fully built task, so applying the same action twice
/// (e.g. when replaying after the initial load) yields the same result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Create(Task),
    ToggleCompleted {
        id: TaskId,
    },
    Delete {
        id: TaskId,
    },
    Edit {
        id: TaskId,
        title: String,
        description: String,
    },
}

impl TaskAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::ToggleCompleted { .. } => "toggle_completed",
            Self::Delete { .. } => "delete",
            Self::Edit { .. } => "edit",
        }
    }
}

/// Apply `action` to `tasks`.
///
/// Returns `None` when the action does not change the list: unknown id,
/// or a create whose id is already taken.
pub fn reduce(tasks: &[Task], action: &TaskAction) -> Option<Vec<Task>> {
    match action {
        TaskAction::Create(task) => {
            if tasks.iter().any(|t| t.id == task.id) {
                return None;
            }
            let mut next = Vec::with_capacity(tasks.len() + 1);
            next.push(task.clone());
            next.extend_from_slice(tasks);
            Some(next)
        }
        TaskAction::ToggleCompleted { id } => {
            let pos = position(tasks, id)?;
            let mut next = tasks.to_vec();
            next[pos].completed = !next[pos].completed;
            Some(next)
        }
        TaskAction::Delete { id } => {
            let pos = position(tasks, id)?;
            let mut next = tasks.to_vec();
            next.remove(pos);
            Some(next)
        }
        TaskAction::Edit {
            id,
            title,
            description,
        } => {
            let pos = position(tasks, id)?;
            let mut next = tasks.to_vec();
            next[pos].title = title.clone();
            next[pos].description = description.clone();
            Some(next)
        }
    }
}

fn position(tasks: &[Task], id: &TaskId) -> Option<usize> {
    tasks.iter().position(|t| &t.id == id)
}
