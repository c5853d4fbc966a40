//! Change request models: isolated, reviewable sets of proposed edits.

use leafpress_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Change types
// ---------------------------------------------------------------------------

pub const CHANGE_TYPE_CREATE: &str = "create";
pub const CHANGE_TYPE_UPDATE: &str = "update";
pub const CHANGE_TYPE_DELETE: &str = "delete";

// ---------------------------------------------------------------------------
// ChangeRequest
// ---------------------------------------------------------------------------

/// A change request row from the `change_requests` table.
///
/// `status` holds a
/// [`ChangeRequestStatus`](leafpress_core::change_request::ChangeRequestStatus)
/// string; transitions go through the core state machine.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChangeRequest {
    pub id: DbId,
    pub space_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub source_branch: String,
    pub target_branch: String,
    pub created_by: DbId,
    pub merged_by: Option<DbId>,
    pub merged_at: Option<Timestamp>,
    pub merge_commit_sha: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for opening a change request (always starts as a draft).
#[derive(Debug, Clone, Deserialize)]
pub struct NewChangeRequest {
    pub space_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub source_branch: String,
    pub target_branch: String,
    pub created_by: DbId,
}

// ---------------------------------------------------------------------------
// ChangeRequestChange
// ---------------------------------------------------------------------------

/// A per-page diff record within a change request.
///
/// `page_id` is `None` for creations (the page does not exist on the
/// target yet); `page_path` always identifies the page.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChangeRequestChange {
    pub id: DbId,
    pub change_request_id: DbId,
    pub page_id: Option<DbId>,
    pub page_path: String,
    pub change_type: String,
    pub content_before: Option<serde_json::Value>,
    pub content_after: Option<serde_json::Value>,
    /// Line-level diff of the serialized forms, for review display.
    pub block_diff: serde_json::Value,
    pub has_conflict: bool,
    pub created_at: Timestamp,
}

/// Input for recording one page's proposed change.
#[derive(Debug, Clone)]
pub struct NewChange {
    pub change_request_id: DbId,
    pub page_id: Option<DbId>,
    pub page_path: String,
    pub change_type: String,
    pub content_before: Option<serde_json::Value>,
    pub content_after: Option<serde_json::Value>,
    pub block_diff: serde_json::Value,
}
