//! Repository for the `git_sync_configs` table.

use leafpress_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::git_sync_config::{GitSyncConfig, NewSyncConfig};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, space_id, repository, default_branch, root_path, include_patterns, \
    exclude_patterns, sync_status, last_sync_commit, last_synced_at, sync_started_at, \
    last_error, created_at, updated_at";

/// Provides CRUD and sync-mutex operations for sync configs.
pub struct GitSyncConfigRepo;

impl GitSyncConfigRepo {
    /// Insert a new sync config in the `idle` state. A space may hold at
    /// most one config; a duplicate surfaces as a unique-constraint
    /// violation.
    pub async fn create(pool: &PgPool, input: &NewSyncConfig) -> Result<GitSyncConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO git_sync_configs
                (space_id, repository, default_branch, root_path, include_patterns, exclude_patterns)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GitSyncConfig>(&query)
            .bind(input.space_id)
            .bind(&input.repository)
            .bind(&input.default_branch)
            .bind(&input.root_path)
            .bind(&input.include_patterns)
            .bind(&input.exclude_patterns)
            .fetch_one(pool)
            .await
    }

    /// Find a sync config by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GitSyncConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM git_sync_configs WHERE id = $1");
        sqlx::query_as::<_, GitSyncConfig>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the sync config bound to a space, if any.
    pub async fn find_by_space(
        pool: &PgPool,
        space_id: DbId,
    ) -> Result<Option<GitSyncConfig>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM git_sync_configs WHERE space_id = $1");
        sqlx::query_as::<_, GitSyncConfig>(&query)
            .bind(space_id)
            .fetch_optional(pool)
            .await
    }

    // ── Sync mutex ───────────────────────────────────────────────────

    /// Compare-and-set the status to `syncing`. Returns `true` when this
    /// caller acquired the mutex, `false` when a sync already owns it.
    pub async fn try_begin_sync(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE git_sync_configs \
             SET sync_status = 'syncing', sync_started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND sync_status <> 'syncing'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Release the mutex into a terminal status. `last_sync_commit` only
    /// advances when a new commit is given; `last_synced_at` is stamped
    /// on success only.
    pub async fn finish_sync(
        pool: &PgPool,
        id: DbId,
        status: &str,
        new_last_commit: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE git_sync_configs SET \
                sync_status = $2, \
                sync_started_at = NULL, \
                last_sync_commit = COALESCE($3, last_sync_commit), \
                last_synced_at = CASE WHEN $2 = 'success' THEN NOW() ELSE last_synced_at END, \
                last_error = $4, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(new_last_commit)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List configs stuck in `syncing` since before `stuck_before`
    /// (watchdog sweep input).
    pub async fn list_stuck(
        pool: &PgPool,
        stuck_before: Timestamp,
    ) -> Result<Vec<GitSyncConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM git_sync_configs \
             WHERE sync_status = 'syncing' AND sync_started_at < $1"
        );
        sqlx::query_as::<_, GitSyncConfig>(&query)
            .bind(stuck_before)
            .fetch_all(pool)
            .await
    }
}
