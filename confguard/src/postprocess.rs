//! Finding postprocessing: line-range inference from evidence text, stable
//! display-ID assignment, severity ordering and the findings cap.

use std::sync::OnceLock;

use regex::Regex;

use crate::findings::{FileType, Finding, LineRange};
use crate::normalize::{normalize_ws, strip_quotes};
use crate::settings::{DEFAULT_FINDINGS_LIMIT, MAX_FINDINGS_LIMIT};

fn absence_of_user_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\babsence of user directive\b|no.*\buser\b").unwrap()
    })
}

/// Fallback anchor used when evidence describes a missing required
/// directive rather than a literal line.
fn anchor_re(file_type: FileType) -> Option<&'static Regex> {
    static DOCKERFILE: OnceLock<Regex> = OnceLock::new();
    static K8S: OnceLock<Regex> = OnceLock::new();
    match file_type {
        FileType::Dockerfile => Some(
            DOCKERFILE.get_or_init(|| Regex::new(r"(?i)^\s*(CMD|ENTRYPOINT)\b").unwrap()),
        ),
        FileType::K8s => Some(K8S.get_or_init(|| Regex::new(r"^\s*containers\s*:").unwrap())),
        _ => None,
    }
}

/// Locates the line a finding's evidence refers to. Returns `None` rather
/// than fabricating a range when nothing matches.
fn infer_line_range(text: &str, evidence: &str, file_type: FileType) -> Option<LineRange> {
    if evidence.is_empty() {
        return None;
    }
    let lines: Vec<&str> = text.lines().collect();

    // Absence-of-directive evidence pins to the relevant anchor line.
    if absence_of_user_re().is_match(evidence) {
        if let Some(anchor) = anchor_re(file_type) {
            for (i, line) in lines.iter().enumerate() {
                if anchor.is_match(line) {
                    return Some(LineRange(i + 1, i + 1));
                }
            }
        }
    }

    let ev = strip_quotes(&normalize_ws(evidence));
    for (i, line) in lines.iter().enumerate() {
        let normalized = strip_quotes(&normalize_ws(line));
        if normalized.is_empty() {
            continue;
        }
        if normalized.contains(&ev) || ev.contains(&normalized) {
            return Some(LineRange(i + 1, i + 1));
        }
    }
    None
}

/// Sorts descending by severity, breaking ties by ascending normalized
/// title.
#[must_use]
pub fn sort_findings_desc(findings: &[Finding]) -> Vec<Finding> {
    let mut sorted = findings.to_vec();
    sorted.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| normalize_ws(&a.title).cmp(&normalize_ws(&b.title)))
    });
    sorted
}

/// Input to [`postprocess`].
#[derive(Debug)]
pub struct PostprocessInput<'a> {
    /// File category, used for line anchors and ID prefixes.
    pub file_type: FileType,
    /// Resolved source text the findings refer to.
    pub source_text: &'a str,
    /// Merged findings to finalize.
    pub findings: Vec<Finding>,
    /// Optional cap override; defaults to 8, hard ceiling 50.
    pub limit: Option<usize>,
}

/// Finalizes a merged finding collection: infers missing line ranges, sorts
/// by severity, assigns `CG-<prefix>-NNN` IDs from the sorted position and
/// truncates to the cap. Truncation happens after sorting so the most
/// severe findings are always retained.
#[must_use]
pub fn postprocess(input: PostprocessInput<'_>) -> Vec<Finding> {
    let limit = input
        .limit
        .unwrap_or(DEFAULT_FINDINGS_LIMIT)
        .clamp(1, MAX_FINDINGS_LIMIT);

    let enriched: Vec<Finding> = input
        .findings
        .into_iter()
        .map(|mut f| {
            if f.line_range.is_none() {
                f.line_range = infer_line_range(input.source_text, &f.evidence, input.file_type);
            }
            f
        })
        .collect();

    let prefix = input.file_type.id_prefix();
    let mut sorted = sort_findings_desc(&enriched);
    for (idx, finding) in sorted.iter_mut().enumerate() {
        finding.id = format!("CG-{prefix}-{:03}", idx + 1);
    }
    sorted.truncate(limit);
    sorted
}
