//! Text normalization and cluster-key derivation. Two findings describe the
//! same root issue when their cluster keys collide.

use crate::findings::Finding;

/// Collapses whitespace runs to single spaces, trims, lowercases.
#[must_use]
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Strips quote and backtick characters. Rule-authored and model-authored
/// evidence differ most often in exactly these.
#[must_use]
pub fn strip_quotes(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '`' | '\'' | '"')).collect()
}

/// Clustering key for dedup. Evidence (the literal snippet) is a stronger
/// identity signal than title wording, so a non-empty normalized evidence is
/// the key on its own; the title|evidence pair is the fallback.
#[must_use]
pub fn cluster_key(finding: &Finding) -> String {
    let evidence = strip_quotes(&normalize_ws(&finding.evidence));
    if !evidence.is_empty() {
        return evidence;
    }
    format!(
        "{}|{}",
        normalize_ws(&finding.title),
        normalize_ws(&finding.evidence)
    )
}
