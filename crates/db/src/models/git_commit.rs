//! Git commit record models.

use leafpress_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A commit record from the `git_commits` table.
///
/// `(config_id, sha)` is unique — webhook redeliveries that reference an
/// already-recorded commit insert nothing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GitCommitRecord {
    pub id: DbId,
    pub config_id: DbId,
    pub sha: String,
    /// `"push"` or `"pull"`.
    pub direction: String,
    pub change_request_id: Option<DbId>,
    pub files_changed: i32,
    pub message: String,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for recording a commit.
#[derive(Debug, Clone)]
pub struct NewCommitRecord {
    pub config_id: DbId,
    pub sha: String,
    pub direction: String,
    pub change_request_id: Option<DbId>,
    pub files_changed: i32,
    pub message: String,
}
