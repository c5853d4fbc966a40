//! The persistence collaborator consumed by the engine.
//!
//! The engine never talks to a database driver directly; it holds an
//! `Arc<dyn Store>`. Operations that must be atomic (version
//! snapshot + content update, the sync-status compare-and-set, review
//! upserts) are single trait methods so each backend keeps its own
//! transactional discipline.
//!
//! Backends: [`PgStore`] (Postgres via the repositories) and
//! [`MemoryStore`] (arena-backed, for tests and database-free embedding).

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use leafpress_core::content::PageContent;
use leafpress_core::error::CoreError;
use leafpress_core::sync::{SyncRunStatus, SyncStatus};
use leafpress_core::types::{DbId, Timestamp};

use crate::models::{
    ChangeRequest, ChangeRequestChange, GitBranch, GitCommitRecord, GitSyncConfig, NewChange,
    NewChangeRequest, NewCommitRecord, NewPage, NewSpace, NewSyncConfig, NewSyncHistory, Page,
    PageRelocation, PageVersion, Review, Space, SyncCounts, SyncHistory,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Uniqueness violations (duplicate path, duplicate commit sha).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Internal(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            StoreError::Conflict(msg) => CoreError::Conflict(msg),
            StoreError::Database(e) => CoreError::Internal(format!("database error: {e}")),
            StoreError::Internal(msg) => CoreError::Internal(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Pages and spaces
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageStore: Send + Sync {
    async fn create_space(&self, space: NewSpace) -> StoreResult<Space>;
    async fn get_space(&self, id: DbId) -> StoreResult<Option<Space>>;

    /// Create a page with its initial content. Duplicate paths within the
    /// space are [`StoreError::Conflict`].
    async fn create_page(&self, page: NewPage) -> StoreResult<Page>;
    async fn get_page(&self, id: DbId) -> StoreResult<Option<Page>>;
    async fn get_page_by_path(&self, space_id: DbId, path: &str) -> StoreResult<Option<Page>>;

    /// All live pages of a space, ordered by path.
    async fn list_pages(&self, space_id: DbId) -> StoreResult<Vec<Page>>;

    /// Live pages updated after `since`, or all live pages for `None`.
    /// Push uses this to collect outgoing changes.
    async fn list_pages_updated_since(
        &self,
        space_id: DbId,
        since: Option<Timestamp>,
    ) -> StoreResult<Vec<Page>>;

    /// Live children of a parent (or root pages for `None`), ordered by
    /// position.
    async fn list_children(&self, space_id: DbId, parent: Option<DbId>) -> StoreResult<Vec<Page>>;

    /// The page's current content snapshot, reassembled from its blocks.
    async fn get_page_content(&self, page_id: DbId) -> StoreResult<PageContent>;

    /// Apply a batch of subtree relocations in one transaction.
    async fn relocate_pages(&self, relocations: &[PageRelocation]) -> StoreResult<()>;

    /// Renumber sibling positions in one transaction.
    async fn reorder_pages(&self, orderings: &[(DbId, i32)]) -> StoreResult<()>;

    async fn soft_delete_page(&self, page_id: DbId) -> StoreResult<bool>;

    /// Store both sides of an unresolved conflict on the page, leaving
    /// its live content untouched.
    async fn set_page_conflict(
        &self,
        page_id: DbId,
        local: &PageContent,
        remote: &PageContent,
    ) -> StoreResult<()>;

    async fn clear_page_conflict(&self, page_id: DbId) -> StoreResult<()>;

    async fn count_conflicted_pages(&self, space_id: DbId) -> StoreResult<i64>;
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Snapshot the page's current content as the next version, then
    /// apply `content` — one atomic unit. Returns the created version.
    async fn update_page_content(
        &self,
        page_id: DbId,
        content: &PageContent,
        author: Option<DbId>,
        note: Option<&str>,
        commit_sha: Option<&str>,
    ) -> StoreResult<PageVersion>;

    /// Versions of a page, newest first.
    async fn list_versions(&self, page_id: DbId) -> StoreResult<Vec<PageVersion>>;

    async fn get_version(&self, page_id: DbId, number: i32) -> StoreResult<Option<PageVersion>>;
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SyncStore: Send + Sync {
    async fn create_sync_config(&self, config: NewSyncConfig) -> StoreResult<GitSyncConfig>;
    async fn get_sync_config(&self, id: DbId) -> StoreResult<Option<GitSyncConfig>>;
    async fn get_sync_config_for_space(&self, space_id: DbId)
        -> StoreResult<Option<GitSyncConfig>>;

    /// Compare-and-set the config's status to `syncing` iff it is not
    /// already `syncing`. Returns whether the mutex was acquired.
    async fn try_begin_sync(&self, config_id: DbId) -> StoreResult<bool>;

    /// Leave the `syncing` state: set the terminal status, record the
    /// error if any, advance `last_sync_commit` when given, and stamp
    /// `last_synced_at` on success.
    async fn finish_sync(
        &self,
        config_id: DbId,
        status: SyncStatus,
        new_last_commit: Option<&str>,
        error: Option<&str>,
    ) -> StoreResult<()>;

    /// Configs that entered `syncing` before `stuck_before`.
    async fn list_stuck_syncs(&self, stuck_before: Timestamp) -> StoreResult<Vec<GitSyncConfig>>;

    /// Insert-if-absent on (config, sha). Returns `true` when the commit
    /// was new, `false` on redelivery.
    async fn record_commit(&self, commit: NewCommitRecord) -> StoreResult<bool>;

    /// Recorded commits of a config, newest first.
    async fn list_commits(&self, config_id: DbId) -> StoreResult<Vec<GitCommitRecord>>;

    /// Create or update a branch head. Setting `is_default` clears any
    /// previous default in the same transaction.
    async fn upsert_branch(
        &self,
        config_id: DbId,
        name: &str,
        head_sha: Option<&str>,
        is_default: bool,
    ) -> StoreResult<GitBranch>;

    async fn list_branches(&self, config_id: DbId) -> StoreResult<Vec<GitBranch>>;

    async fn create_sync_history(&self, history: NewSyncHistory) -> StoreResult<SyncHistory>;

    /// Complete a running history row exactly once; completed rows are
    /// never mutated again.
    async fn complete_sync_history(
        &self,
        id: DbId,
        status: SyncRunStatus,
        end_commit: Option<&str>,
        counts: SyncCounts,
        error: Option<&str>,
    ) -> StoreResult<SyncHistory>;

    async fn get_sync_history(&self, id: DbId) -> StoreResult<Option<SyncHistory>>;

    /// All runs of a config, newest first.
    async fn list_histories(&self, config_id: DbId) -> StoreResult<Vec<SyncHistory>>;

    /// Running history rows for a config (used by the watchdog sweep).
    async fn find_running_histories(&self, config_id: DbId) -> StoreResult<Vec<SyncHistory>>;
}

// ---------------------------------------------------------------------------
// Change requests
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChangeRequestStore: Send + Sync {
    async fn create_change_request(
        &self,
        change_request: NewChangeRequest,
    ) -> StoreResult<ChangeRequest>;
    async fn get_change_request(&self, id: DbId) -> StoreResult<Option<ChangeRequest>>;
    async fn set_change_request_status(&self, id: DbId, status: &str)
        -> StoreResult<ChangeRequest>;

    /// Mark merged: status, merged_by/merged_at, and the merge commit in
    /// one update.
    async fn mark_merged(
        &self,
        id: DbId,
        merged_by: DbId,
        commit_sha: &str,
    ) -> StoreResult<ChangeRequest>;

    async fn add_change(&self, change: NewChange) -> StoreResult<ChangeRequestChange>;
    async fn list_changes(&self, change_request_id: DbId)
        -> StoreResult<Vec<ChangeRequestChange>>;
    async fn set_change_conflict(&self, change_id: DbId, has_conflict: bool) -> StoreResult<()>;

    /// One review row per (change request, reviewer); a repeated submit
    /// updates in place. A `pending` upsert assigns the reviewer.
    async fn upsert_review(
        &self,
        change_request_id: DbId,
        reviewer_id: DbId,
        status: &str,
        note: Option<&str>,
    ) -> StoreResult<Review>;

    async fn list_reviews(&self, change_request_id: DbId) -> StoreResult<Vec<Review>>;
}

// ---------------------------------------------------------------------------
// Unified store
// ---------------------------------------------------------------------------

/// The full persistence collaborator.
pub trait Store: PageStore + VersionStore + SyncStore + ChangeRequestStore {}

impl<T: PageStore + VersionStore + SyncStore + ChangeRequestStore> Store for T {}
