//! Repository for the `pages` table.

use leafpress_core::content::PageContent;
use leafpress_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::page::{Page, PageRelocation};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, space_id, parent_page_id, slug, title, path, depth, position, \
    is_published, has_conflict, conflict_local, conflict_remote, deleted_at, created_at, updated_at";

/// Provides CRUD and tree operations for pages.
pub struct PageRepo;

impl PageRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert the page row only; block rows are written by the caller in
    /// the same transaction. Duplicate `(space_id, path)` surfaces as a
    /// unique-constraint violation.
    pub async fn insert(
        conn: &mut PgConnection,
        space_id: DbId,
        parent_page_id: Option<DbId>,
        slug: &str,
        title: &str,
        path: &str,
        depth: i32,
        position: i32,
    ) -> Result<Page, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages (space_id, parent_page_id, slug, title, path, depth, position)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(space_id)
            .bind(parent_page_id)
            .bind(slug)
            .bind(title)
            .bind(path)
            .bind(depth)
            .bind(position)
            .fetch_one(conn)
            .await
    }

    /// Find a page by its internal ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live page by its tree path within a space.
    pub async fn find_by_path(
        pool: &PgPool,
        space_id: DbId,
        path: &str,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages \
             WHERE space_id = $1 AND path = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(space_id)
            .bind(path)
            .fetch_optional(pool)
            .await
    }

    /// List all live pages of a space, ordered by path.
    pub async fn list_by_space(pool: &PgPool, space_id: DbId) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages \
             WHERE space_id = $1 AND deleted_at IS NULL \
             ORDER BY path"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(space_id)
            .fetch_all(pool)
            .await
    }

    /// List live children of a parent (root pages for `None`), ordered by
    /// position.
    pub async fn list_children(
        pool: &PgPool,
        space_id: DbId,
        parent_page_id: Option<DbId>,
    ) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages \
             WHERE space_id = $1 AND parent_page_id IS NOT DISTINCT FROM $2 \
               AND deleted_at IS NULL \
             ORDER BY position"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(space_id)
            .bind(parent_page_id)
            .fetch_all(pool)
            .await
    }

    /// List live pages updated after `since` (used by push to collect
    /// outgoing changes).
    pub async fn list_updated_since(
        pool: &PgPool,
        space_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<Page>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages \
             WHERE space_id = $1 AND updated_at > $2 AND deleted_at IS NULL \
             ORDER BY path"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(space_id)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Soft-delete a page by ID. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE pages SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Tree operations ──────────────────────────────────────────────

    /// Apply one relocation row of a subtree move. The caller batches all
    /// relocations of the move in a single transaction.
    pub async fn relocate(
        conn: &mut PgConnection,
        relocation: &PageRelocation,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE pages SET parent_page_id = $2, path = $3, depth = $4, position = $5, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(relocation.page_id)
        .bind(relocation.parent_page_id)
        .bind(&relocation.path)
        .bind(relocation.depth)
        .bind(relocation.position)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Renumber one sibling's position. Batched in a transaction by the
    /// caller alongside the rest of the ordering.
    pub async fn set_position(
        conn: &mut PgConnection,
        id: DbId,
        position: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE pages SET position = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(position)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Refresh the page title after a content update, inside the same
    /// transaction as the block rewrite.
    pub async fn set_title(
        conn: &mut PgConnection,
        id: DbId,
        title: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE pages SET title = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(title)
            .execute(conn)
            .await?;
        Ok(())
    }

    // ── Conflict markers ─────────────────────────────────────────────

    /// Store both sides of an unresolved conflict on the page. The live
    /// content is left untouched.
    pub async fn set_conflict(
        pool: &PgPool,
        id: DbId,
        local: &PageContent,
        remote: &PageContent,
    ) -> Result<bool, sqlx::Error> {
        let local = serde_json::to_value(local).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let remote = serde_json::to_value(remote).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let result = sqlx::query(
            "UPDATE pages SET has_conflict = true, conflict_local = $2, conflict_remote = $3, \
             updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(local)
        .bind(remote)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear the conflict markers after resolution.
    pub async fn clear_conflict(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pages SET has_conflict = false, conflict_local = NULL, \
             conflict_remote = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count live pages of a space still carrying a conflict marker.
    pub async fn count_conflicted(pool: &PgPool, space_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pages \
             WHERE space_id = $1 AND has_conflict = true AND deleted_at IS NULL",
        )
        .bind(space_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
