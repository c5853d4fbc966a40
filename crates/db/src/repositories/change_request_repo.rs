//! Repository for the `change_requests` and `change_request_changes`
//! tables.

use leafpress_core::types::DbId;
use sqlx::PgPool;

use crate::models::change_request::{
    ChangeRequest, ChangeRequestChange, NewChange, NewChangeRequest,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, space_id, title, description, status, source_branch, target_branch, \
    created_by, merged_by, merged_at, merge_commit_sha, created_at, updated_at";

const CHANGE_COLUMNS: &str = "id, change_request_id, page_id, page_path, change_type, \
    content_before, content_after, block_diff, has_conflict, created_at";

/// Provides CRUD operations for change requests and their per-page
/// change records.
pub struct ChangeRequestRepo;

impl ChangeRequestRepo {
    // ── Change requests ──────────────────────────────────────────────

    /// Open a change request in the `draft` state.
    pub async fn create(
        pool: &PgPool,
        input: &NewChangeRequest,
    ) -> Result<ChangeRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO change_requests
                (space_id, title, description, status, source_branch, target_branch, created_by)
             VALUES ($1, $2, $3, 'draft', $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChangeRequest>(&query)
            .bind(input.space_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.source_branch)
            .bind(&input.target_branch)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a change request by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ChangeRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM change_requests WHERE id = $1");
        sqlx::query_as::<_, ChangeRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List change requests of a space, newest first.
    pub async fn list_by_space(
        pool: &PgPool,
        space_id: DbId,
    ) -> Result<Vec<ChangeRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM change_requests \
             WHERE space_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ChangeRequest>(&query)
            .bind(space_id)
            .fetch_all(pool)
            .await
    }

    /// Set the workflow status. Legality of the transition is the
    /// caller's responsibility.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: &str,
    ) -> Result<Option<ChangeRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE change_requests SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChangeRequest>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Record a merge: terminal status, the merging user, and the merge
    /// commit in one update.
    pub async fn mark_merged(
        pool: &PgPool,
        id: DbId,
        merged_by: DbId,
        commit_sha: &str,
    ) -> Result<Option<ChangeRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE change_requests SET \
                status = 'merged', merged_by = $2, merged_at = NOW(), \
                merge_commit_sha = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChangeRequest>(&query)
            .bind(id)
            .bind(merged_by)
            .bind(commit_sha)
            .fetch_optional(pool)
            .await
    }

    // ── Per-page changes ─────────────────────────────────────────────

    /// Record one page's proposed change.
    pub async fn add_change(
        pool: &PgPool,
        input: &NewChange,
    ) -> Result<ChangeRequestChange, sqlx::Error> {
        let query = format!(
            "INSERT INTO change_request_changes
                (change_request_id, page_id, page_path, change_type, content_before,
                 content_after, block_diff)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {CHANGE_COLUMNS}"
        );
        sqlx::query_as::<_, ChangeRequestChange>(&query)
            .bind(input.change_request_id)
            .bind(input.page_id)
            .bind(&input.page_path)
            .bind(&input.change_type)
            .bind(&input.content_before)
            .bind(&input.content_after)
            .bind(&input.block_diff)
            .fetch_one(pool)
            .await
    }

    /// List a change request's page changes, ordered by page path.
    pub async fn list_changes(
        pool: &PgPool,
        change_request_id: DbId,
    ) -> Result<Vec<ChangeRequestChange>, sqlx::Error> {
        let query = format!(
            "SELECT {CHANGE_COLUMNS} FROM change_request_changes \
             WHERE change_request_id = $1 ORDER BY page_path, id"
        );
        sqlx::query_as::<_, ChangeRequestChange>(&query)
            .bind(change_request_id)
            .fetch_all(pool)
            .await
    }

    /// Flag or clear a change's conflict marker (set when the target
    /// moved under the change since it was recorded).
    pub async fn set_change_conflict(
        pool: &PgPool,
        change_id: DbId,
        has_conflict: bool,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE change_request_changes SET has_conflict = $2 WHERE id = $1")
                .bind(change_id)
                .bind(has_conflict)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
