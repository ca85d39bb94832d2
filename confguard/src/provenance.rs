//! Provenance envelope: a canonicalized, hashed snapshot of a task's
//! findings, summary and patch, stable across serialization runs so the
//! hash can be re-verified later.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::findings::{FileType, Finding};
use crate::postprocess::sort_findings_desc;
use crate::task::AgentTask;

/// Envelope format version.
pub const PROVENANCE_VERSION: &str = "cg-prov-1";

/// The hashed snapshot content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenancePayload {
    /// Task primary key.
    pub task_id: String,
    /// File category.
    pub file_type: FileType,
    /// Analysis summary ("" when analysis has not run).
    pub summary: String,
    /// Findings in canonical order (severity desc, title asc).
    pub findings: Vec<Finding>,
    /// Latest patched text ("" when no autofix ran).
    pub patched_text: String,
    /// Latest unified diff ("" when no autofix ran).
    pub patch_diff: String,
    /// Task creation time.
    pub created_at: DateTime<Utc>,
    /// Task last-update time.
    pub updated_at: DateTime<Utc>,
    /// Envelope format version.
    pub version: &'static str,
}

/// Hash plus the payload it covers, for external verification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceEnvelope {
    /// Hash algorithm identifier.
    pub algo: &'static str,
    /// Hex digest of the canonical payload JSON.
    pub hash: String,
    /// When this envelope was built.
    pub created_at: DateTime<Utc>,
    /// The normalized payload, included so verifiers can re-canonicalize.
    pub payload: ProvenancePayload,
}

/// Serializes with deterministically ordered object keys. `serde_json`
/// maps are `BTreeMap`-backed here (the `preserve_order` feature is off),
/// so routing through `Value` sorts every object level.
pub fn canonical_stringify<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}

/// Hex-encoded SHA-256 of `s`.
#[must_use]
pub fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Builds the provenance envelope for a task, returning it together with
/// the canonical JSON string the hash covers.
pub fn build_envelope(task: &AgentTask) -> serde_json::Result<(ProvenanceEnvelope, String)> {
    let payload = ProvenancePayload {
        task_id: task.id.clone(),
        file_type: task.file_type,
        summary: task.summary.clone().unwrap_or_default(),
        findings: sort_findings_desc(task.findings.as_deref().unwrap_or(&[])),
        patched_text: task.patched_text.clone().unwrap_or_default(),
        patch_diff: task.patch_diff.clone().unwrap_or_default(),
        created_at: task.created_at,
        updated_at: task.updated_at,
        version: PROVENANCE_VERSION,
    };
    let canonical = canonical_stringify(&payload)?;
    let hash = sha256_hex(&canonical);
    let envelope = ProvenanceEnvelope {
        algo: "sha256",
        hash,
        created_at: Utc::now(),
        payload,
    };
    Ok((envelope, canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{FileType, Severity};
    use crate::task::{AgentTask, TaskInput};

    fn task_with_findings() -> AgentTask {
        let mut task = AgentTask::new(
            "tsk_1".to_owned(),
            FileType::Dockerfile,
            TaskInput {
                text: Some("FROM node:latest\n".to_owned()),
                image_base64: None,
            },
        );
        task.summary = Some("posture weak".to_owned());
        task.findings = Some(vec![
            Finding {
                id: "CG-DOCK-002".to_owned(),
                title: "b finding".to_owned(),
                severity: Severity::Low,
                line_range: None,
                evidence: "x".to_owned(),
                rationale: "r".to_owned(),
                recommendation: "rec".to_owned(),
                autofix_hint: None,
                source: None,
            },
            Finding {
                id: "CG-DOCK-001".to_owned(),
                title: "a finding".to_owned(),
                severity: Severity::High,
                line_range: None,
                evidence: "y".to_owned(),
                rationale: "r".to_owned(),
                recommendation: "rec".to_owned(),
                autofix_hint: None,
                source: None,
            },
        ]);
        task
    }

    #[test]
    fn canonical_output_sorts_object_keys() {
        #[derive(Serialize)]
        struct Unordered {
            zebra: u8,
            alpha: u8,
        }
        let s = canonical_stringify(&Unordered { zebra: 1, alpha: 2 }).unwrap();
        assert_eq!(s, r#"{"alpha":2,"zebra":1}"#);
    }

    #[test]
    fn hash_is_stable_for_identical_tasks() {
        let task = task_with_findings();
        let (a, canon_a) = build_envelope(&task).unwrap();
        let (b, canon_b) = build_envelope(&task).unwrap();
        assert_eq!(canon_a, canon_b);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash, sha256_hex(&canon_a));
    }

    #[test]
    fn findings_are_normalized_before_hashing() {
        let task = task_with_findings();
        let (envelope, _) = build_envelope(&task).unwrap();
        // High before Low regardless of stored order.
        assert_eq!(envelope.payload.findings[0].severity, Severity::High);
    }

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
