//! Git branch models.

use leafpress_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A branch row from the `git_branches` table.
///
/// Exactly one branch per config carries `is_default = true`; setting a
/// new default clears the previous one in the same transaction.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GitBranch {
    pub id: DbId,
    pub config_id: DbId,
    pub name: String,
    pub head_sha: Option<String>,
    pub is_default: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
