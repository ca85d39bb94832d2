//! Wire-level finding types shared by the rule engine, the LLM audit and
//! the merge/postprocess pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a finding, totally ordered for merge and sort decisions
/// (`Low < Medium < High < Critical`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational or low-impact issue.
    Low,
    /// Issue worth fixing but not immediately exploitable.
    Medium,
    /// Serious weakness likely to be exploitable.
    High,
    /// Direct, high-impact exposure.
    Critical,
}

impl Severity {
    /// Numeric rank, higher is worse.
    #[must_use]
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Category of configuration file accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Container build file.
    Dockerfile,
    /// Kubernetes cluster manifest.
    K8s,
    /// Environment variable file.
    Env,
    /// Reverse-proxy configuration.
    Nginx,
    /// Access-policy document.
    Iam,
}

impl FileType {
    /// Short code used in display IDs (`CG-<prefix>-NNN`).
    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            FileType::Dockerfile => "DOCK",
            FileType::K8s => "K8S",
            FileType::Env => "ENV",
            FileType::Nginx => "NGX",
            FileType::Iam => "IAM",
        }
    }

    /// Lowercase wire name, also used as the diff filename.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Dockerfile => "dockerfile",
            FileType::K8s => "k8s",
            FileType::Env => "env",
            FileType::Nginx => "nginx",
            FileType::Iam => "iam",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSource {
    /// Deterministic pattern check.
    Rule,
    /// Generative model audit.
    Llm,
}

/// Inclusive 1-based line range, serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange(pub usize, pub usize);

impl LineRange {
    /// Size of the inclusive span; a single-line range has span 0.
    #[must_use]
    pub fn span(self) -> usize {
        self.1.abs_diff(self.0)
    }
}

/// A single security observation about the analyzed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Display identifier (`CG-<prefix>-NNN`), assigned at postprocessing
    /// time. Model-assigned IDs are discarded.
    #[serde(default)]
    pub id: String,
    /// Short human label.
    pub title: String,
    /// Severity level.
    pub severity: Severity,
    /// Location in the source file, if known. Never fabricated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
    /// Literal or near-literal snippet from the source file.
    pub evidence: String,
    /// Why this is risky.
    pub rationale: String,
    /// What to do about it.
    pub recommendation: String,
    /// Concise patch hint, supplementary context only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autofix_hint: Option<String>,
    /// Provenance tag, retained through merge for audit and tie-breaking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FindingSource>,
}

/// Payload shape the LLM audit is instructed to return. Deserializing into
/// this struct is the structural validation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingsPayload {
    /// Echoed file category.
    pub file_type: FileType,
    /// Short summary of the security posture.
    pub summary: String,
    /// Raw findings, pre-merge and pre-postprocess.
    pub findings: Vec<Finding>,
}
