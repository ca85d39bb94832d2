//! Analysis orchestrator: resolves input text (OCR if needed), runs the
//! deterministic rules and the LLM audit, reconciles both streams and
//! persists the finalized findings on the task.

use std::fmt;

use log::{debug, warn};

use crate::findings::{Finding, FindingSource, FindingsPayload};
use crate::llm::json::parse_with_repair;
use crate::llm::prompts;
use crate::llm::{GenError, TextGenerator};
use crate::merge::merge_findings;
use crate::postprocess::{postprocess, PostprocessInput};
use crate::rules::apply_rule_checks;
use crate::settings::Settings;
use crate::store::{TaskPatch, TaskStore};
use crate::task::TaskState;

/// Analysis failure modes surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    /// Unknown task id.
    NotFound,
    /// Task holds neither text nor image input. Detected before any
    /// generative call.
    NoInput,
    /// Backend transient failure (timeout, network), with the underlying
    /// message. Caller-level retry is the recovery mechanism.
    Failed(String),
}

impl fmt::Display for AnalyzeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzeError::NotFound => write!(f, "task not found"),
            AnalyzeError::NoInput => write!(f, "no input text"),
            AnalyzeError::Failed(detail) => write!(f, "analyze failed: {detail}"),
        }
    }
}

impl std::error::Error for AnalyzeError {}

impl From<GenError> for AnalyzeError {
    fn from(e: GenError) -> Self {
        AnalyzeError::Failed(e.to_string())
    }
}

/// What analysis hands back to the caller; the same findings are persisted
/// on the task.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Human-readable posture summary.
    pub summary: String,
    /// Finalized, deduplicated, severity-ordered findings.
    pub findings: Vec<Finding>,
}

/// Runs the full analysis pipeline for `id`.
///
/// Unparseable or schema-invalid model output is a degraded-but-valid
/// result (empty model findings, explanatory summary), not an error: a
/// clean file and a parsing failure are indistinguishable to the caller and
/// neither should block the workflow.
pub async fn analyze_task(
    store: &TaskStore,
    llm: &dyn TextGenerator,
    settings: &Settings,
    id: &str,
) -> Result<AnalysisOutcome, AnalyzeError> {
    let task = store.get(id).ok_or(AnalyzeError::NotFound)?;

    // Resolve input text; OCR results are persisted so autofix can diff
    // against the same text later.
    let text = match task.input.text.clone() {
        Some(text) => text,
        None => {
            let Some(image) = task.input.image_base64.clone() else {
                return Err(AnalyzeError::NoInput);
            };
            let ocr = llm
                .generate_from_image(prompts::OCR_INSTRUCTION, &image, "image/png")
                .await?;
            let mut input = task.input.clone();
            input.text = Some(ocr.clone());
            store.update(id, TaskPatch {
                input: Some(input),
                ..TaskPatch::default()
            });
            ocr
        }
    };

    let rule_findings = apply_rule_checks(&text, task.file_type);
    debug!(
        "task {id}: {} deterministic finding(s) before LLM audit",
        rule_findings.len()
    );

    let raw = llm
        .generate_json(&prompts::analyze_prompt(task.file_type, &text))
        .await?;
    let parsed = parse_with_repair(&raw, |bad| async move {
        llm.generate_json(&prompts::repair_json_prompt(&bad)).await
    })
    .await?;

    let mut summary = if rule_findings.is_empty() {
        "No deterministic findings.".to_owned()
    } else {
        "Deterministic rule findings.".to_owned()
    };

    let mut llm_findings: Vec<Finding> = Vec::new();
    let payload = parsed.and_then(|value| serde_json::from_value::<FindingsPayload>(value).ok());
    match payload {
        Some(payload) => {
            if !payload.summary.is_empty() {
                summary = payload.summary;
            }
            llm_findings = payload
                .findings
                .into_iter()
                .map(|mut f| {
                    f.source = Some(FindingSource::Llm);
                    f
                })
                .collect();
        }
        None => {
            warn!("task {id}: LLM audit output unparseable, continuing degraded");
            if rule_findings.is_empty() {
                summary = "LLM returned no parseable findings.".to_owned();
            }
        }
    }

    let merged = merge_findings(&rule_findings, &llm_findings);
    let findings = postprocess(PostprocessInput {
        file_type: task.file_type,
        source_text: &text,
        findings: merged,
        limit: Some(settings.findings_limit),
    });

    store.update(id, TaskPatch {
        state: Some(TaskState::Planned),
        findings: Some(findings.clone()),
        summary: Some(summary.clone()),
        ..TaskPatch::default()
    });

    Ok(AnalysisOutcome { summary, findings })
}
