//! Task record owned by the store: what kind of file it holds, where the
//! workflow stands, and everything the pipeline has produced so far.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::findings::{FileType, Finding};

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    /// Input received, nothing computed yet.
    Ingested,
    /// Raw analysis ran.
    Analyzed,
    /// Findings merged and postprocessed.
    Planned,
    /// Corrective patch synthesized.
    Patched,
    /// Patch verified.
    Verified,
    /// Report generated.
    Reported,
    /// Workflow complete.
    Done,
}

/// Raw input attached to a task: literal text, an image to OCR, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    /// Literal file content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 image data (screenshot of a config file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// One unit of analysis work, tracked from ingestion through patching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTask {
    /// Primary key (`tsk_<millis>`).
    pub id: String,
    /// Category of the configuration file.
    pub file_type: FileType,
    /// Current workflow state.
    pub state: TaskState,
    /// Raw input. OCR results are persisted back into `input.text`.
    pub input: TaskInput,
    /// Authoritative finding set, replaced wholesale on re-analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<Vec<Finding>>,
    /// Analysis summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Unified diff of the latest autofix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_diff: Option<String>,
    /// Full replacement file text of the latest autofix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patched_text: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp, refreshed on every store update.
    pub updated_at: DateTime<Utc>,
}

impl AgentTask {
    /// Creates a fresh task in the `Ingested` state.
    #[must_use]
    pub fn new(id: String, file_type: FileType, input: TaskInput) -> Self {
        let now = Utc::now();
        Self {
            id,
            file_type,
            state: TaskState::Ingested,
            input,
            findings: None,
            summary: None,
            patch_diff: None,
            patched_text: None,
            created_at: now,
            updated_at: now,
        }
    }
}
