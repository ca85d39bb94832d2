//! In-memory task store: primary-key lookup plus whole-record
//! shallow-merge updates. Last write wins; there is no multi-writer
//! conflict detection and no persistence across restarts.

use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use rustc_hash::FxHashMap;

use crate::findings::{FileType, Finding};
use crate::task::{AgentTask, TaskInput, TaskState};

/// Partial update applied to a task. `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct TaskPatch {
    /// New workflow state.
    pub state: Option<TaskState>,
    /// Replacement input (used to persist OCR text).
    pub input: Option<TaskInput>,
    /// Replacement finding set.
    pub findings: Option<Vec<Finding>>,
    /// Replacement summary.
    pub summary: Option<String>,
    /// Replacement patch diff.
    pub patch_diff: Option<String>,
    /// Replacement patched text.
    pub patched_text: Option<String>,
}

/// Keyed task store backed by a `RwLock`ed map.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<FxHashMap<String, AgentTask>>,
}

impl TaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a task from raw input and inserts it, returning its id.
    pub fn create_task(&self, file_type: FileType, input: TaskInput) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let id = format!("tsk_{millis}");
        self.create(AgentTask::new(id.clone(), file_type, input));
        id
    }

    /// Inserts a fully-formed task record.
    pub fn create(&self, task: AgentTask) {
        if let Ok(mut tasks) = self.tasks.write() {
            tasks.insert(task.id.clone(), task);
        }
    }

    /// Returns a clone of the task, or `None` if the id is unknown.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<AgentTask> {
        self.tasks.read().ok()?.get(id).cloned()
    }

    /// Shallow-merges `patch` into the stored record and refreshes
    /// `updated_at`. Returns the updated record, or `None` for unknown ids.
    pub fn update(&self, id: &str, patch: TaskPatch) -> Option<AgentTask> {
        let mut tasks = self.tasks.write().ok()?;
        let task = tasks.get_mut(id)?;
        if let Some(state) = patch.state {
            task.state = state;
        }
        if let Some(input) = patch.input {
            task.input = input;
        }
        if let Some(findings) = patch.findings {
            task.findings = Some(findings);
        }
        if let Some(summary) = patch.summary {
            task.summary = Some(summary);
        }
        if let Some(diff) = patch.patch_diff {
            task.patch_diff = Some(diff);
        }
        if let Some(text) = patch.patched_text {
            task.patched_text = Some(text);
        }
        task.updated_at = Utc::now();
        Some(task.clone())
    }
}
