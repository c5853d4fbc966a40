//! Page version models: the immutable per-page snapshot log.

use leafpress_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A page version row from the `page_versions` table.
///
/// `version_number` is strictly increasing per page with no gaps or
/// reuse. The snapshot holds the page content *as it was before* the
/// update that produced this version.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PageVersion {
    pub id: DbId,
    pub page_id: DbId,
    pub version_number: i32,
    /// JSON-encoded [`PageContent`](leafpress_core::content::PageContent).
    pub content: serde_json::Value,
    pub created_by: Option<DbId>,
    pub change_note: Option<String>,
    pub git_commit_sha: Option<String>,
    pub created_at: Timestamp,
}
