//! Line and block diff utilities.
//!
//! Change requests record a per-page diff alongside their before/after
//! snapshots; the diff is computed over the canonical serialized form so
//! it reflects exactly what a repository commit would show.

use serde::{Deserialize, Serialize};

use crate::content::PageContent;
use crate::markdown;

// ---------------------------------------------------------------------------
// Diff types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Removed,
    Changed,
    Unchanged,
}

/// A single line in a diff result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub status: DiffStatus,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Line diff
// ---------------------------------------------------------------------------

/// Compute a line-level diff between two texts using LCS.
pub fn compute_line_diff(old: &str, new: &str) -> Vec<DiffLine> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let m = old_lines.len();
    let n = new_lines.len();

    // Build LCS table.
    let mut lcs = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            if old_lines[i - 1] == new_lines[j - 1] {
                lcs[i][j] = lcs[i - 1][j - 1] + 1;
            } else {
                lcs[i][j] = lcs[i - 1][j].max(lcs[i][j - 1]);
            }
        }
    }

    // Backtrack to produce the diff.
    let mut result = Vec::new();
    let mut i = m;
    let mut j = n;
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_lines[i - 1] == new_lines[j - 1] {
            result.push(DiffLine {
                status: DiffStatus::Unchanged,
                content: old_lines[i - 1].to_string(),
            });
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || lcs[i][j - 1] >= lcs[i - 1][j]) {
            result.push(DiffLine {
                status: DiffStatus::Added,
                content: new_lines[j - 1].to_string(),
            });
            j -= 1;
        } else {
            result.push(DiffLine {
                status: DiffStatus::Removed,
                content: old_lines[i - 1].to_string(),
            });
            i -= 1;
        }
    }

    result.reverse();
    result
}

// ---------------------------------------------------------------------------
// Content diff
// ---------------------------------------------------------------------------

/// Diff two content snapshots in their serialized file form.
///
/// `None` on either side stands for a page that does not exist there
/// (creation or deletion).
pub fn diff_content(before: Option<&PageContent>, after: Option<&PageContent>) -> Vec<DiffLine> {
    let old = before.map(markdown::serialize).unwrap_or_default();
    let new = after.map(markdown::serialize).unwrap_or_default();
    compute_line_diff(&old, &new)
}

/// Whether a diff contains any effective change.
pub fn has_changes(diff: &[DiffLine]) -> bool {
    diff.iter().any(|d| d.status != DiffStatus::Unchanged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BlockNode, BlockType};

    // -- compute_line_diff ---------------------------------------------------

    #[test]
    fn diff_identical_texts() {
        let diff = compute_line_diff("line1\nline2", "line1\nline2");
        assert_eq!(diff.len(), 2);
        assert!(diff.iter().all(|d| d.status == DiffStatus::Unchanged));
    }

    #[test]
    fn diff_added_line() {
        let diff = compute_line_diff("line1", "line1\nline2");
        assert_eq!(diff.len(), 2);
        assert_eq!(diff[0].status, DiffStatus::Unchanged);
        assert_eq!(diff[1].status, DiffStatus::Added);
        assert_eq!(diff[1].content, "line2");
    }

    #[test]
    fn diff_removed_line() {
        let diff = compute_line_diff("line1\nline2", "line1");
        assert_eq!(diff[1].status, DiffStatus::Removed);
    }

    #[test]
    fn diff_changed_line() {
        let diff = compute_line_diff("hello", "world");
        assert_eq!(diff.len(), 2);
        let statuses: Vec<_> = diff.iter().map(|d| d.status).collect();
        assert!(statuses.contains(&DiffStatus::Removed));
        assert!(statuses.contains(&DiffStatus::Added));
    }

    // -- diff_content --------------------------------------------------------

    fn page(text: &str) -> PageContent {
        PageContent::new("T").with_blocks(vec![BlockNode::leaf(BlockType::Paragraph, text)])
    }

    #[test]
    fn content_diff_of_equal_snapshots_has_no_changes() {
        let a = page("same");
        let diff = diff_content(Some(&a), Some(&a.clone()));
        assert!(!has_changes(&diff));
    }

    #[test]
    fn content_diff_of_edit_shows_change() {
        let diff = diff_content(Some(&page("old")), Some(&page("new")));
        assert!(has_changes(&diff));
    }

    #[test]
    fn created_page_is_all_additions() {
        let diff = diff_content(None, Some(&page("fresh")));
        assert!(diff.iter().all(|d| d.status == DiffStatus::Added));
        assert!(!diff.is_empty());
    }

    #[test]
    fn deleted_page_is_all_removals() {
        let diff = diff_content(Some(&page("gone")), None);
        assert!(diff.iter().all(|d| d.status == DiffStatus::Removed));
    }
}
