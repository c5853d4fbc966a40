//! Repository for the `git_commits` table.

use leafpress_core::types::DbId;
use sqlx::PgPool;

use crate::models::git_commit::{GitCommitRecord, NewCommitRecord};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, config_id, sha, direction, change_request_id, files_changed, message, created_at";

/// Provides append-and-dedup access to recorded commits.
pub struct GitCommitRepo;

impl GitCommitRepo {
    /// Record a commit if its `(config_id, sha)` pair is new. Returns
    /// `true` when a row was inserted, `false` on a redelivered sha.
    pub async fn record(pool: &PgPool, input: &NewCommitRecord) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO git_commits \
                (config_id, sha, direction, change_request_id, files_changed, message) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (config_id, sha) DO NOTHING",
        )
        .bind(input.config_id)
        .bind(&input.sha)
        .bind(&input.direction)
        .bind(input.change_request_id)
        .bind(input.files_changed)
        .bind(&input.message)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a recorded commit by sha.
    pub async fn find_by_sha(
        pool: &PgPool,
        config_id: DbId,
        sha: &str,
    ) -> Result<Option<GitCommitRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM git_commits WHERE config_id = $1 AND sha = $2");
        sqlx::query_as::<_, GitCommitRecord>(&query)
            .bind(config_id)
            .bind(sha)
            .fetch_optional(pool)
            .await
    }

    /// List recorded commits for a config, newest first.
    pub async fn list_by_config(
        pool: &PgPool,
        config_id: DbId,
    ) -> Result<Vec<GitCommitRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM git_commits WHERE config_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, GitCommitRecord>(&query)
            .bind(config_id)
            .fetch_all(pool)
            .await
    }
}
