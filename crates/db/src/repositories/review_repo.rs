//! Repository for the `reviews` table.

use leafpress_core::types::DbId;
use sqlx::PgPool;

use crate::models::review::Review;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, change_request_id, reviewer_id, status, note, created_at, updated_at";

/// Provides review submission and listing.
pub struct ReviewRepo;

impl ReviewRepo {
    /// Submit or re-submit a review. One row per (change request,
    /// reviewer); a repeated submit overwrites the verdict in place. A
    /// `pending` upsert is how a reviewer gets assigned.
    pub async fn upsert(
        pool: &PgPool,
        change_request_id: DbId,
        reviewer_id: DbId,
        status: &str,
        note: Option<&str>,
    ) -> Result<Review, sqlx::Error> {
        let query = format!(
            "INSERT INTO reviews (change_request_id, reviewer_id, status, note)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (change_request_id, reviewer_id) DO UPDATE SET
                status = EXCLUDED.status,
                note = EXCLUDED.note,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(change_request_id)
            .bind(reviewer_id)
            .bind(status)
            .bind(note)
            .fetch_one(pool)
            .await
    }

    /// List reviews of a change request, oldest first.
    pub async fn list_by_change_request(
        pool: &PgPool,
        change_request_id: DbId,
    ) -> Result<Vec<Review>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reviews \
             WHERE change_request_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Review>(&query)
            .bind(change_request_id)
            .fetch_all(pool)
            .await
    }
}
