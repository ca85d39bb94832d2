//! Prompt builders for the audit, repair, autofix and report calls. The
//! wording carries the output contract, so changes here ripple into the
//! sanitize/validate logic downstream.

use crate::findings::{FileType, Finding};

/// Instruction used for the OCR call on image-only tasks.
pub const OCR_INSTRUCTION: &str =
    "Extract the literal text content of this configuration file or terminal output.";

/// Category-spanning audit prompt requesting strictly-valid JSON.
#[must_use]
pub fn analyze_prompt(file_type: FileType, content: &str) -> String {
    format!(
        r#"System: You are a senior security configuration auditor.
Your task is to perform a comprehensive, multi-category audit of the given {file_type} configuration.
Think like a DevSecOps engineer reviewing for production readiness.

Analyze the file across categories including:
- Supply-chain and dependency security (e.g. unpinned images, unsafe base images)
- Identity and privilege management (runAsNonRoot, allowPrivilegeEscalation, IAM roles, USER directives)
- Network and access exposure (open ports, public endpoints, unencrypted connections)
- Resource governance (resource limits, excessive privileges, missing quotas)
- Secrets and credentials exposure (.env values, tokens, hardcoded keys)
- File system and storage (mounts, hostPath, writable volumes)
- Logging and observability best practices
- Compliance and least privilege
- Other configuration weaknesses that could affect security, stability, or reliability.

Constraints:
- If exact line numbers are unknown, omit "lineRange".
- Avoid duplicates (normalize by title+evidence).
- Limit to the top 8 most important findings.
- Output strictly valid JSON only.
- Do not report the same root cause twice. If a single directive (e.g., "COPY . .") has multiple impacts (secrets risk + image bloat), combine them into ONE finding with a combined rationale and recommendation.

Return ONLY valid JSON with the following structure:
{{
  "fileType": "{file_type}",
  "summary": "short summary of security posture",
  "findings": [
    {{
      "id": "CG-XXX",
      "title": "finding title",
      "severity": "LOW" | "MEDIUM" | "HIGH" | "CRITICAL",
      "lineRange": [start, end],
      "evidence": "exact line or snippet",
      "rationale": "why this is risky",
      "recommendation": "what to do",
      "autofixHint": "concise patch hint if possible"
    }}
  ]
}}
Do NOT include any prose, commentary, or markdown outside this JSON.

Now audit this file thoroughly:
{content}
"#
    )
}

/// One-shot JSON repair prompt restating the target shape. Forbids invented
/// line numbers.
#[must_use]
pub fn repair_json_prompt(bad: &str) -> String {
    format!(
        r#"You are a strict JSON fixer. Convert the following model output into STRICTLY VALID JSON with this shape:

{{
  "fileType": "dockerfile" | "k8s" | "env" | "nginx" | "iam",
  "summary": string,
  "findings": [
    {{
      "id": string,
      "title": string,
      "severity": "LOW" | "MEDIUM" | "HIGH" | "CRITICAL",
      "lineRange": [number, number] (optional),
      "evidence": string,
      "rationale": string,
      "recommendation": string,
      "autofixHint": string (optional)
    }}
  ]
}}

Rules:
- Return ONLY the JSON object, no code fences, no prose.
- If fields are missing, infer minimally or omit optional fields.
- Do NOT invent line numbers. Omit lineRange if unknown.

MODEL OUTPUT TO FIX:
{bad}
"#
    )
}

/// Minimal-patch prompt: full final file as plain text, smallest edits,
/// no opportunistic additions.
#[must_use]
pub fn autofix_prompt(file_type: FileType, original: &str, findings_json: &str) -> String {
    format!(
        r"You are a security remediation assistant. Produce a corrected version of the {file_type} file below.

Hard constraints:
- Address ONLY the findings listed; change nothing else.
- Prefer the smallest possible edits.
- Do NOT add OS-level package installations or image labels/metadata unless a finding explicitly requires them.
- Do NOT introduce new tooling solely to implement a health check.
- Respond with the FULL final file as plain text. No JSON, no code fences, no quoting, no commentary.

Findings (JSON):
{findings_json}

Original file:
{original}
"
    )
}

/// Stricter retry variant used after a minimality violation was stripped.
#[must_use]
pub fn autofix_prompt_minimal_retry(
    file_type: FileType,
    original: &str,
    findings_json: &str,
) -> String {
    format!(
        r"Your previous patch added packages or labels that no finding asked for. Try again.

Produce a corrected version of the {file_type} file below, and this time:
- Touch ONLY lines implicated by the findings.
- Absolutely NO package-manager install commands (apt-get install, apk add, yum install).
- Absolutely NO LABEL or metadata directives.
- Respond with the FULL final file as plain text only. No JSON, no fences, no quotes.

Findings (JSON):
{findings_json}

Original file:
{original}
"
    )
}

/// Repair prompt used when the model returned structured operations instead
/// of plain file text.
#[must_use]
pub fn autofix_repair_to_plaintext(original: &str, structured: &str) -> String {
    format!(
        r"You returned structured patch operations instead of the final file. Apply the operations described below to the original file and return ONLY the final file as plain text. No JSON, no code fences, no quoting.

Original file:
{original}

Structured output to apply:
{structured}
"
    )
}

/// Markdown report prompt over the finalized findings.
#[must_use]
pub fn report_prompt(file_type: FileType, findings: &[Finding], summary: &str) -> String {
    let mut rendered = String::new();
    for (i, f) in findings.iter().enumerate() {
        rendered.push_str(&format!(
            "\n{}. **{}** ({})\n   - **Evidence**: `{}`\n   - **Rationale**: {}\n   - **Recommendation**: {}\n",
            i + 1,
            f.title,
            f.severity,
            f.evidence,
            f.rationale,
            f.recommendation,
        ));
        if let Some(lr) = f.line_range {
            rendered.push_str(&format!("   - **Location**: Lines {}-{}\n", lr.0, lr.1));
        }
    }

    format!(
        r"Generate a comprehensive security report in Markdown format for a {file_type} configuration file analysis.

Findings Summary: {summary}

Security Findings:
{rendered}

Please generate a professional security report that includes:
1. Executive Summary
2. Risk Assessment
3. Detailed Findings
4. Recommendations
5. Next Steps

Format the report in clean Markdown with proper headers, bullet points, and code blocks where appropriate.
"
    )
}
