//! Repository for the `page_versions` table.

use leafpress_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::page_version::PageVersion;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, page_id, version_number, content, created_by, change_note, \
    git_commit_sha, created_at";

/// Provides access to the immutable per-page version log.
pub struct PageVersionRepo;

impl PageVersionRepo {
    /// Insert a snapshot as the next version of a page, auto-assigning
    /// the number from the current maximum. Runs inside the caller's
    /// transaction so the number assignment and the content update it
    /// belongs to commit together.
    pub async fn snapshot(
        conn: &mut PgConnection,
        page_id: DbId,
        content: &serde_json::Value,
        created_by: Option<DbId>,
        change_note: Option<&str>,
        git_commit_sha: Option<&str>,
    ) -> Result<PageVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO page_versions
                (page_id, version_number, content, created_by, change_note, git_commit_sha)
             VALUES (
                $1,
                (SELECT COALESCE(MAX(version_number), 0) + 1 FROM page_versions WHERE page_id = $1),
                $2, $3, $4, $5
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PageVersion>(&query)
            .bind(page_id)
            .bind(content)
            .bind(created_by)
            .bind(change_note)
            .bind(git_commit_sha)
            .fetch_one(conn)
            .await
    }

    /// List all versions of a page, newest first.
    pub async fn list_by_page(
        pool: &PgPool,
        page_id: DbId,
    ) -> Result<Vec<PageVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM page_versions \
             WHERE page_id = $1 ORDER BY version_number DESC"
        );
        sqlx::query_as::<_, PageVersion>(&query)
            .bind(page_id)
            .fetch_all(pool)
            .await
    }

    /// Find one version of a page by its number.
    pub async fn find_by_number(
        pool: &PgPool,
        page_id: DbId,
        version_number: i32,
    ) -> Result<Option<PageVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM page_versions \
             WHERE page_id = $1 AND version_number = $2"
        );
        sqlx::query_as::<_, PageVersion>(&query)
            .bind(page_id)
            .bind(version_number)
            .fetch_optional(pool)
            .await
    }
}
