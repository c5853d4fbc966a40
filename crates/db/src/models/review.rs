//! Review models.

use leafpress_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A review row from the `reviews` table.
///
/// One row per (change request, reviewer); submitting again upserts the
/// same row rather than appending. A `pending` row doubles as the
/// reviewer assignment.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: DbId,
    pub change_request_id: DbId,
    pub reviewer_id: DbId,
    /// `"pending"`, `"approved"`, `"changes_requested"`, or `"commented"`.
    pub status: String,
    pub note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
