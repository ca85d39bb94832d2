//! Patch synthesizer: drives the generative backend to a full replacement
//! file, constrains the free-form output into a narrow edit envelope
//! (sanitize, one structured-output repair, minimality enforcement with one
//! bounded retry, deterministic base-image pinning) and derives the unified
//! diff.

use std::fmt;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::diff::build_unified_diff;
use crate::findings::Finding;
use crate::llm::prompts;
use crate::llm::{GenError, TextGenerator};
use crate::settings::Settings;
use crate::store::{TaskPatch, TaskStore};
use crate::task::TaskState;

/// Patch synthesis failure modes surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutofixError {
    /// Unknown task id.
    NotFound,
    /// Task has no resolved text to patch (image-only, not yet analyzed).
    NoOriginalText,
    /// Task has no findings; analysis must run first.
    NoFindings,
    /// Backend contract violation: still-structured output after the one
    /// permitted repair attempt. Terminal; the caller may re-invoke from
    /// scratch.
    BadFormat,
    /// Backend transient failure with the underlying message.
    Failed(String),
}

impl fmt::Display for AutofixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutofixError::NotFound => write!(f, "task not found"),
            AutofixError::NoOriginalText => write!(
                f,
                "original text required (image OCR not persisted yet); provide text"
            ),
            AutofixError::NoFindings => write!(f, "no findings on task; run analyze first"),
            AutofixError::BadFormat => write!(
                f,
                "model returned structured patch instead of file text after repair; please retry"
            ),
            AutofixError::Failed(detail) => write!(f, "autofix failed: {detail}"),
        }
    }
}

impl std::error::Error for AutofixError {}

impl From<GenError> for AutofixError {
    fn from(e: GenError) -> Self {
        AutofixError::Failed(e.to_string())
    }
}

fn leading_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*```[a-z]*\s*").unwrap())
}

fn trailing_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*```\s*$").unwrap())
}

/// Cleans model output down to plain multiline text: trims, strips a single
/// markdown fence, and unwraps one layer of matching quotes (unescaping
/// once).
#[must_use]
pub fn sanitize_patched_text(s: &str) -> String {
    let mut out = s.trim().to_owned();

    out = leading_fence_re().replace(&out, "").into_owned();
    out = trailing_fence_re().replace(&out, "").into_owned();
    out = out.trim().to_owned();

    let quoted = (out.starts_with('"') && out.ends_with('"') && out.len() >= 2)
        || (out.starts_with('\'') && out.ends_with('\'') && out.len() >= 2);
    if quoted {
        out = out[1..out.len() - 1].to_owned();
        out = out
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\\"", "\"")
            .replace("\\'", "'")
            .replace("\\\\", "\\");
    }

    out.trim().to_owned()
}

fn json_patch_op_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)"op"\s*:\s*"(add|remove|replace|move|copy|test)""#).unwrap()
    })
}

/// True when the text still looks like JSON or JSON-Patch operations rather
/// than plain file content.
#[must_use]
pub fn looks_structured_patch(s: &str) -> bool {
    let t = s.trim();
    t.starts_with('[') || t.starts_with('{') || json_patch_op_re().is_match(t)
}

fn disallowed_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^label\s+|\bapt-get\s+install\b|\bapk\s+add\b|\byum\s+install\b").unwrap()
    })
}

/// A line that adds image labels or OS-level packages, which the minimality
/// policy forbids unless a finding asks for them.
#[must_use]
pub fn is_disallowed_line(line: &str) -> bool {
    disallowed_line_re().is_match(&line.trim().to_lowercase())
}

fn allow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"healthcheck.+requires.+curl|install.+package|label").unwrap())
}

/// Whether the findings textually permit package installs or labels.
///
/// Known-loose keyword scan over the serialized findings: any mention of
/// "label" (or an install/package phrase) anywhere in the findings grants
/// permission, so false positives suppress stripping that should happen,
/// and findings phrased unusually can cause stripping that should not.
/// Isolated here so a structured permissions field on `Finding` can replace
/// it without touching call sites.
#[must_use]
pub fn findings_allow_packages_or_labels(findings: &[Finding]) -> bool {
    let blob = serde_json::to_string(findings)
        .unwrap_or_default()
        .to_lowercase();
    allow_re().is_match(&blob)
}

/// Strips disallowed lines unless the findings permit them. `ok` is false
/// when stripping actually removed content.
fn strip_disallowed_if_needed(patched: &str, findings: &[Finding]) -> (bool, String) {
    if findings_allow_packages_or_labels(findings) {
        return (true, patched.to_owned());
    }
    let kept: Vec<&str> = patched
        .lines()
        .filter(|line| !is_disallowed_line(line))
        .collect();
    let changed = kept.len() != patched.lines().count();
    (!changed, kept.join("\n").trim().to_owned())
}

fn from_node_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*FROM\s+node:(\S+)(?:\s+AS\s+([A-Za-z0-9_-]+))?\s*$").unwrap()
    })
}

/// Deterministically pins Node base images: the first `FROM node:*` becomes
/// a pinned builder stage, subsequent ones the pinned `-slim` variant
/// (preserving any existing stage alias). Non-Node lines pass through
/// unchanged.
#[must_use]
pub fn normalize_node_base_images(patched: &str, version: &str) -> String {
    let mut from_node_count = 0u32;
    let rewritten: Vec<String> = patched
        .lines()
        .map(|line| {
            let Some(caps) = from_node_re().captures(line) else {
                return line.to_owned();
            };
            from_node_count += 1;
            if from_node_count == 1 {
                format!("FROM node:{version} AS builder")
            } else {
                let alias = caps
                    .get(2)
                    .map(|m| format!(" AS {}", m.as_str()))
                    .unwrap_or_default();
                format!("FROM node:{version}-slim{alias}")
            }
        })
        .collect();
    rewritten.join("\n")
}

/// One generation attempt reduced to plain text: sanitize, detect
/// structured output, at most one plaintext repair, re-sanitize. The final
/// validity check is the caller's.
async fn plain_candidate(
    llm: &dyn TextGenerator,
    prompt: &str,
    original: &str,
) -> Result<String, AutofixError> {
    let raw = llm.generate_plain(prompt).await?;
    let mut text = sanitize_patched_text(&raw);
    if looks_structured_patch(&text) {
        debug!("autofix: structured output detected, issuing one plaintext repair");
        let repaired = llm
            .generate_plain(&prompts::autofix_repair_to_plaintext(original, &text))
            .await?;
        text = sanitize_patched_text(&repaired);
    }
    Ok(text)
}

/// Synthesizes a minimal corrective patch for `id` from its persisted
/// findings, returning the unified diff and persisting
/// `{state: PATCHED, patchDiff, patchedText}`.
pub async fn autofix_task(
    store: &TaskStore,
    llm: &dyn TextGenerator,
    settings: &Settings,
    id: &str,
) -> Result<String, AutofixError> {
    let task = store.get(id).ok_or(AutofixError::NotFound)?;

    let Some(original) = task.input.text.clone() else {
        return Err(AutofixError::NoOriginalText);
    };
    let findings = task.findings.clone().unwrap_or_default();
    if findings.is_empty() {
        return Err(AutofixError::NoFindings);
    }

    let findings_json = serde_json::to_string(&serde_json::json!({
        "fileType": task.file_type,
        "findings": findings,
    }))
    .map_err(|e| AutofixError::Failed(e.to_string()))?;

    // First attempt: full file as plain text. Still-structured output after
    // the single repair is a contract violation, not something to loop on.
    let candidate = plain_candidate(
        llm,
        &prompts::autofix_prompt(task.file_type, &original, &findings_json),
        &original,
    )
    .await?;
    if looks_structured_patch(&candidate) {
        return Err(AutofixError::BadFormat);
    }

    // Minimality enforcement with exactly one retry cycle. The retry's
    // output is accepted after an unconditional hard strip.
    let (ok, stripped) = strip_disallowed_if_needed(&candidate, &findings);
    let mut patched = if ok {
        stripped
    } else {
        warn!("autofix: disallowed lines stripped, retrying with stricter prompt");
        let retry = plain_candidate(
            llm,
            &prompts::autofix_prompt_minimal_retry(task.file_type, &original, &findings_json),
            &original,
        )
        .await?;
        let (_, hard_stripped) = strip_disallowed_if_needed(&retry, &findings);
        hard_stripped
    };

    patched = normalize_node_base_images(&patched, &settings.node_base_version);

    let diff = build_unified_diff(task.file_type.as_str(), &original, &patched);

    store.update(id, TaskPatch {
        state: Some(TaskState::Patched),
        patch_diff: Some(diff.clone()),
        patched_text: Some(patched),
        ..TaskPatch::default()
    });

    Ok(diff)
}
