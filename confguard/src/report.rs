//! Markdown report generation over a task's finalized findings.

use std::fmt;

use crate::llm::prompts::report_prompt;
use crate::llm::{GenError, TextGenerator};
use crate::store::{TaskPatch, TaskStore};
use crate::task::TaskState;

/// Report generation failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Unknown task id.
    NotFound,
    /// Task has no findings; analysis must run first.
    NoFindings,
    /// Backend transient failure with the underlying message.
    Failed(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::NotFound => write!(f, "task not found"),
            ReportError::NoFindings => write!(f, "no findings on task; run analyze first"),
            ReportError::Failed(detail) => write!(f, "report generation failed: {detail}"),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<GenError> for ReportError {
    fn from(e: GenError) -> Self {
        ReportError::Failed(e.to_string())
    }
}

/// Generates a Markdown security report for `id` from its persisted
/// findings and summary.
pub async fn generate_report(
    store: &TaskStore,
    llm: &dyn TextGenerator,
    id: &str,
) -> Result<String, ReportError> {
    let task = store.get(id).ok_or(ReportError::NotFound)?;

    let findings = task.findings.clone().unwrap_or_default();
    if findings.is_empty() {
        return Err(ReportError::NoFindings);
    }

    let summary = task
        .summary
        .clone()
        .unwrap_or_else(|| "Security analysis completed".to_owned());
    let prompt = report_prompt(task.file_type, &findings, &summary);
    let markdown = llm.generate_plain(&prompt).await?;

    store.update(id, TaskPatch {
        state: Some(TaskState::Reported),
        ..TaskPatch::default()
    });

    Ok(markdown)
}
