//! Repository for the `blocks` table.
//!
//! Blocks are always rewritten wholesale with their page's content, so
//! the write path is delete-then-insert inside the caller's transaction.

use leafpress_core::content::PageContent;
use leafpress_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::block::{flatten_content, Block};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, page_id, parent_block_id, block_type, position, content, ref_block_id, \
     created_at, updated_at";

/// Provides block-row access for page content storage.
pub struct BlockRepo;

impl BlockRepo {
    /// Load all block rows of a page.
    pub async fn list_by_page(pool: &PgPool, page_id: DbId) -> Result<Vec<Block>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM blocks WHERE page_id = $1 ORDER BY id");
        sqlx::query_as::<_, Block>(&query)
            .bind(page_id)
            .fetch_all(pool)
            .await
    }

    /// Load all block rows of a page inside a transaction.
    pub async fn list_by_page_in_tx(
        conn: &mut PgConnection,
        page_id: DbId,
    ) -> Result<Vec<Block>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM blocks WHERE page_id = $1 ORDER BY id");
        sqlx::query_as::<_, Block>(&query)
            .bind(page_id)
            .fetch_all(conn)
            .await
    }

    /// Replace a page's blocks with the given content snapshot.
    ///
    /// Rows are inserted parent-before-child so each child can reference
    /// its parent's freshly assigned id. Must run inside the caller's
    /// transaction together with the page/version bookkeeping.
    pub async fn replace_for_page(
        conn: &mut PgConnection,
        page_id: DbId,
        content: &PageContent,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM blocks WHERE page_id = $1")
            .bind(page_id)
            .execute(&mut *conn)
            .await?;

        let flat = flatten_content(content);
        let mut ids: Vec<DbId> = Vec::with_capacity(flat.len());
        for block in &flat {
            let parent_block_id = block.parent_idx.map(|idx| ids[idx]);
            let row: (DbId,) = sqlx::query_as(
                "INSERT INTO blocks (page_id, parent_block_id, block_type, position, content, ref_block_id) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .bind(page_id)
            .bind(parent_block_id)
            .bind(&block.block_type)
            .bind(block.position)
            .bind(&block.content)
            .bind(block.ref_block_id)
            .fetch_one(&mut *conn)
            .await?;
            ids.push(row.0);
        }
        Ok(())
    }
}
