//! Unified diff construction between the original file and the synthesized
//! patch, labeled with before/after revision markers.

use similar::TextDiff;

/// Builds a line-based unified diff with 3 context lines per hunk. Both
/// sides carry the file's own name, distinguished by before/after markers.
#[must_use]
pub fn build_unified_diff(filename: &str, original: &str, patched: &str) -> String {
    TextDiff::from_lines(original, patched)
        .unified_diff()
        .context_radius(3)
        .header(
            &format!("{filename}\tbefore"),
            &format!("{filename}\tafter"),
        )
        .to_string()
}
