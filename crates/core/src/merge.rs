//! Three-way merge decision over base/local/remote content.
//!
//! The comparison runs over the canonical serialized form of a page, so
//! two trees that serialize identically are considered equal. Conflicts
//! are never auto-resolved; the engine stores both sides and waits for an
//! explicit resolution choice.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Decision of the three-way comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Local and remote agree; nothing to apply.
    Unchanged,
    /// Local is untouched since base; fast-forward to remote.
    TakeRemote,
    /// Remote is untouched since base; local wins, nothing to apply.
    KeepLocal,
    /// Both sides diverged from base; requires explicit resolution.
    Conflict,
}

/// Compare base (content as of the last synced commit), local (current
/// store content), and remote (incoming file content).
pub fn resolve(base: &str, local: &str, remote: &str) -> MergeOutcome {
    if local == remote {
        MergeOutcome::Unchanged
    } else if local == base {
        MergeOutcome::TakeRemote
    } else if remote == base {
        MergeOutcome::KeepLocal
    } else {
        MergeOutcome::Conflict
    }
}

// ---------------------------------------------------------------------------
// Resolution choice
// ---------------------------------------------------------------------------

/// Explicit resolution for a conflicted page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionChoice {
    KeepLocal,
    TakeRemote,
    /// Caller supplies merged content alongside this choice.
    Merged,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sides_are_unchanged() {
        assert_eq!(resolve("A", "B", "B"), MergeOutcome::Unchanged);
        assert_eq!(resolve("A", "A", "A"), MergeOutcome::Unchanged);
    }

    #[test]
    fn untouched_local_fast_forwards_to_remote() {
        assert_eq!(resolve("A", "A", "B"), MergeOutcome::TakeRemote);
    }

    #[test]
    fn untouched_remote_keeps_local() {
        assert_eq!(resolve("A", "B", "A"), MergeOutcome::KeepLocal);
    }

    #[test]
    fn divergent_sides_conflict() {
        assert_eq!(resolve("A", "B", "C"), MergeOutcome::Conflict);
    }

    #[test]
    fn new_on_both_sides_with_same_text_is_unchanged() {
        // Page created independently in store and repository with equal
        // content: base is empty, sides agree.
        assert_eq!(resolve("", "X", "X"), MergeOutcome::Unchanged);
    }
}
