//! Page models: nodes of a space's content tree.

use leafpress_core::content::PageContent;
use leafpress_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A page row from the `pages` table.
///
/// `path` is unique within the space and always starts with `/`. While a
/// page is in conflict, `conflict_local`/`conflict_remote` hold both
/// sides as content snapshots and the live content stays untouched.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Page {
    pub id: DbId,
    pub space_id: DbId,
    pub parent_page_id: Option<DbId>,
    pub slug: String,
    pub title: String,
    pub path: String,
    pub depth: i32,
    pub position: i32,
    pub is_published: bool,
    pub has_conflict: bool,
    pub conflict_local: Option<serde_json::Value>,
    pub conflict_remote: Option<serde_json::Value>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for creating a page, with its initial content.
///
/// Creation stores the content directly without a version row; the first
/// content-changing update snapshots it as version 1.
#[derive(Debug, Clone)]
pub struct NewPage {
    pub space_id: DbId,
    pub parent_page_id: Option<DbId>,
    pub slug: String,
    pub path: String,
    pub depth: i32,
    pub position: i32,
    pub content: PageContent,
}

// ---------------------------------------------------------------------------
// Move DTO
// ---------------------------------------------------------------------------

/// One page's new location within a subtree move, applied as a batch in a
/// single transaction.
#[derive(Debug, Clone)]
pub struct PageRelocation {
    pub page_id: DbId,
    pub parent_page_id: Option<DbId>,
    pub path: String,
    pub depth: i32,
    pub position: i32,
}
