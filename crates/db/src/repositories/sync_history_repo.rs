//! Repository for the `sync_history` table.

use leafpress_core::types::DbId;
use sqlx::PgPool;

use crate::models::sync_history::{NewSyncHistory, SyncCounts, SyncHistory};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, config_id, operation, status, start_commit, end_commit, \
    files_processed, pages_created, pages_updated, pages_deleted, conflict_count, error, \
    started_at, finished_at";

/// Provides access to the append-only sync run log.
pub struct SyncHistoryRepo;

impl SyncHistoryRepo {
    /// Open a sync run in the `running` state.
    pub async fn create(pool: &PgPool, input: &NewSyncHistory) -> Result<SyncHistory, sqlx::Error> {
        let query = format!(
            "INSERT INTO sync_history (config_id, operation, status, start_commit)
             VALUES ($1, $2, 'running', $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SyncHistory>(&query)
            .bind(input.config_id)
            .bind(&input.operation)
            .bind(&input.start_commit)
            .fetch_one(pool)
            .await
    }

    /// Complete a run with its terminal status and counters. The guard on
    /// `status = 'running'` makes completion idempotent: an already
    /// completed row is returned unchanged as `None`.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        status: &str,
        end_commit: Option<&str>,
        counts: SyncCounts,
        error: Option<&str>,
    ) -> Result<Option<SyncHistory>, sqlx::Error> {
        let query = format!(
            "UPDATE sync_history SET \
                status = $2, end_commit = $3, files_processed = $4, pages_created = $5, \
                pages_updated = $6, pages_deleted = $7, conflict_count = $8, error = $9, \
                finished_at = NOW() \
             WHERE id = $1 AND status = 'running' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SyncHistory>(&query)
            .bind(id)
            .bind(status)
            .bind(end_commit)
            .bind(counts.files_processed)
            .bind(counts.pages_created)
            .bind(counts.pages_updated)
            .bind(counts.pages_deleted)
            .bind(counts.conflict_count)
            .bind(error)
            .fetch_optional(pool)
            .await
    }

    /// Find a sync run by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SyncHistory>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sync_history WHERE id = $1");
        sqlx::query_as::<_, SyncHistory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List runs of a config still in the `running` state, oldest first.
    pub async fn list_running(
        pool: &PgPool,
        config_id: DbId,
    ) -> Result<Vec<SyncHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sync_history \
             WHERE config_id = $1 AND status = 'running' ORDER BY started_at"
        );
        sqlx::query_as::<_, SyncHistory>(&query)
            .bind(config_id)
            .fetch_all(pool)
            .await
    }

    /// List all runs of a config, newest first.
    pub async fn list_by_config(
        pool: &PgPool,
        config_id: DbId,
    ) -> Result<Vec<SyncHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sync_history \
             WHERE config_id = $1 ORDER BY started_at DESC, id DESC"
        );
        sqlx::query_as::<_, SyncHistory>(&query)
            .bind(config_id)
            .fetch_all(pool)
            .await
    }
}
