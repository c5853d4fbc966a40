//! Repository for the `spaces` table.

use leafpress_core::types::DbId;
use sqlx::PgPool;

use crate::models::space::{NewSpace, Space};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, slug, required_approvals, deleted_at, created_at, updated_at";

/// Provides CRUD operations for spaces.
pub struct SpaceRepo;

impl SpaceRepo {
    /// Insert a new space. A `None` approval policy falls back to the
    /// default of one required approval.
    pub async fn create(pool: &PgPool, input: &NewSpace) -> Result<Space, sqlx::Error> {
        let query = format!(
            "INSERT INTO spaces (name, slug, required_approvals)
             VALUES ($1, $2, COALESCE($3, 1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Space>(&query)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(input.required_approvals)
            .fetch_one(pool)
            .await
    }

    /// Find a space by its internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Space>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM spaces WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Space>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a space by its slug. Excludes soft-deleted rows.
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Space>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM spaces WHERE slug = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Space>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a space by ID. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE spaces SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
