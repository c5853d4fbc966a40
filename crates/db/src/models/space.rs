//! Space models: a documentation site owning a page tree and bound to at
//! most one git sync config.

use leafpress_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A space row from the `spaces` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Space {
    pub id: DbId,
    pub name: String,
    pub slug: String,
    /// Review policy: approvals required before a change request may
    /// merge. Defaults to 1; `0` lets unapproved change requests merge.
    pub required_approvals: i32,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for creating a new space.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSpace {
    pub name: String,
    pub slug: String,
    /// `None` keeps the default policy of one required approval.
    pub required_approvals: Option<i32>,
}
