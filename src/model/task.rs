use serde::{Deserialize, Serialize};

/// Task identifier. Remote ids come from the gateway, local ids are synthesized.
pub type TaskId = u64;

/// Where a task's id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOrigin {
    /// Id assigned by the remote gateway
    #[default]
    Remote,
    /// Id synthesized by the engine; never sent to the gateway
    Local,
}

/// A task in the authoritative collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Task text (non-empty after trim)
    pub text: String,
    pub completed: bool,
    /// Opaque owner id assigned by the gateway
    pub owner_id: u64,
    /// Category reference; may dangle if the category was deleted
    #[serde(default)]
    pub category_id: Option<String>,
    /// Client-stamped when the engine first observed the task
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub origin: TaskOrigin,
}

impl Task {
    /// Create a remote-origin task with no category and no timestamp
    pub fn new(id: TaskId, text: impl Into<String>, completed: bool, owner_id: u64) -> Self {
        Task {
            id,
            text: text.into(),
            completed,
            owner_id,
            category_id: None,
            created_at: None,
            origin: TaskOrigin::Remote,
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin == TaskOrigin::Local
    }
}

/// Partial update for a task's text and/or completion flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn text(text: impl Into<String>) -> Self {
        TaskPatch {
            text: Some(text.into()),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        TaskPatch {
            text: None,
            completed: Some(completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }

    /// Overwrite the fields present in the patch
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref text) = self.text {
            task.text = text.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}
