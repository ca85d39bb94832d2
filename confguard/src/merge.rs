//! Finding reconciliation. Rule checks and the LLM audit regularly report
//! the same root issue with different severities and wording; this module
//! folds both collections into one record per cluster key, keeping the
//! highest severity and the richest text of each field.

use crate::findings::{Finding, FindingSource, LineRange};
use crate::normalize::cluster_key;

/// Chooses the more informative of two text fields: empty loses, otherwise
/// the longer string wins. Exact-length ties keep `a` (the winner's text).
fn richer(a: &str, b: &str) -> String {
    if a.is_empty() {
        return b.to_owned();
    }
    if b.is_empty() {
        return a.to_owned();
    }
    if b.len() > a.len() {
        b.to_owned()
    } else {
        a.to_owned()
    }
}

/// Picks one line range: a lone value wins; when both exist, the smaller
/// inclusive span (the more precise localization) wins, ties keeping `a`.
fn pick_line_range(a: Option<LineRange>, b: Option<LineRange>) -> Option<LineRange> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if b.span() < a.span() {
                Some(b)
            } else {
                Some(a)
            }
        }
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn is_llm(f: &Finding) -> bool {
    f.source == Some(FindingSource::Llm)
}

/// Merges two findings that share a cluster key.
///
/// Higher severity picks the winner base record; a severity tie prefers the
/// model-derived side's framing. Text fields are then chosen per-field, so
/// the merged record can combine parts of both inputs.
fn merge_two(prev: &Finding, cur: &Finding) -> Finding {
    let by_severity = if prev.severity >= cur.severity { prev } else { cur };

    let prefer_llm = prev.severity == cur.severity && (is_llm(prev) != is_llm(cur));
    let winner = if prefer_llm {
        if is_llm(prev) {
            prev
        } else {
            cur
        }
    } else {
        by_severity
    };
    let loser = if std::ptr::eq(winner, prev) { cur } else { prev };

    let source = if prev.source.is_some() && cur.source.is_some() {
        if prefer_llm {
            Some(FindingSource::Llm)
        } else {
            winner.source
        }
    } else {
        winner.source.or(prev.source).or(cur.source)
    };

    Finding {
        id: winner.id.clone(),
        title: winner.title.clone(),
        severity: winner.severity,
        line_range: pick_line_range(prev.line_range, cur.line_range),
        evidence: richer(&winner.evidence, &loser.evidence),
        rationale: richer(&winner.rationale, &loser.rationale),
        recommendation: richer(&winner.recommendation, &loser.recommendation),
        autofix_hint: winner.autofix_hint.clone().or_else(|| loser.autofix_hint.clone()),
        source,
    }
}

/// Merges two finding collections into one deduplicated collection with
/// exactly one entry per distinct cluster key.
///
/// Pure and deterministic: folds left-to-right over `a` then `b`, so the
/// earlier occurrence is always the `prev` side of a pairwise merge.
#[must_use]
pub fn merge_findings(a: &[Finding], b: &[Finding]) -> Vec<Finding> {
    let mut keys: Vec<String> = Vec::new();
    let mut merged: Vec<Finding> = Vec::new();

    for finding in a.iter().chain(b.iter()) {
        let key = cluster_key(finding);
        match keys.iter().position(|k| *k == key) {
            Some(idx) => {
                let combined = merge_two(&merged[idx], finding);
                merged[idx] = combined;
            }
            None => {
                keys.push(key);
                merged.push(finding.clone());
            }
        }
    }
    merged
}
