//! Repository for the `git_branches` table.

use leafpress_core::types::DbId;
use sqlx::PgPool;

use crate::models::git_branch::GitBranch;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, config_id, name, head_sha, is_default, created_at, updated_at";

/// Provides branch tracking per sync config.
pub struct GitBranchRepo;

impl GitBranchRepo {
    /// Create or update a branch head. Making a branch the default clears
    /// the previous default in the same transaction, so exactly one
    /// default survives.
    pub async fn upsert(
        pool: &PgPool,
        config_id: DbId,
        name: &str,
        head_sha: Option<&str>,
        is_default: bool,
    ) -> Result<GitBranch, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if is_default {
            sqlx::query(
                "UPDATE git_branches SET is_default = false, updated_at = NOW() \
                 WHERE config_id = $1 AND is_default = true AND name <> $2",
            )
            .bind(config_id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }

        let query = format!(
            "INSERT INTO git_branches (config_id, name, head_sha, is_default)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (config_id, name) DO UPDATE SET
                head_sha = COALESCE(EXCLUDED.head_sha, git_branches.head_sha),
                is_default = EXCLUDED.is_default,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        let branch = sqlx::query_as::<_, GitBranch>(&query)
            .bind(config_id)
            .bind(name)
            .bind(head_sha)
            .bind(is_default)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(branch)
    }

    /// List branches of a config, default first then by name.
    pub async fn list_by_config(
        pool: &PgPool,
        config_id: DbId,
    ) -> Result<Vec<GitBranch>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM git_branches \
             WHERE config_id = $1 ORDER BY is_default DESC, name"
        );
        sqlx::query_as::<_, GitBranch>(&query)
            .bind(config_id)
            .fetch_all(pool)
            .await
    }
}
