//! Postgres-backed store, delegating to the repositories.

use async_trait::async_trait;
use leafpress_core::content::PageContent;
use leafpress_core::sync::{SyncRunStatus, SyncStatus};
use leafpress_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::{
    assemble_content, ChangeRequest, ChangeRequestChange, GitBranch, GitCommitRecord,
    GitSyncConfig, NewChange, NewChangeRequest, NewCommitRecord, NewPage, NewSpace, NewSyncConfig,
    NewSyncHistory, Page, PageRelocation, PageVersion, Review, Space, SyncCounts, SyncHistory,
};
use crate::repositories::{
    BlockRepo, ChangeRequestRepo, GitBranchRepo, GitCommitRepo, GitSyncConfigRepo, PageRepo,
    PageVersionRepo, ReviewRepo, SpaceRepo, SyncHistoryRepo,
};
use crate::store::{
    ChangeRequestStore, PageStore, StoreError, StoreResult, SyncStore, VersionStore,
};

/// [`Store`](crate::store::Store) backend over a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique-constraint violation to [`StoreError::Conflict`], keeping
/// everything else as a database error.
fn map_unique(err: sqlx::Error, what: &str) -> StoreError {
    let is_unique = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if is_unique {
        StoreError::Conflict(format!("{what} already exists"))
    } else {
        StoreError::Database(err)
    }
}

// ---------------------------------------------------------------------------
// PageStore
// ---------------------------------------------------------------------------

#[async_trait]
impl PageStore for PgStore {
    async fn create_space(&self, space: NewSpace) -> StoreResult<Space> {
        SpaceRepo::create(&self.pool, &space)
            .await
            .map_err(|e| map_unique(e, "space slug"))
    }

    async fn get_space(&self, id: DbId) -> StoreResult<Option<Space>> {
        Ok(SpaceRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_page(&self, page: NewPage) -> StoreResult<Page> {
        let mut tx = self.pool.begin().await?;
        let row = PageRepo::insert(
            &mut tx,
            page.space_id,
            page.parent_page_id,
            &page.slug,
            &page.content.title,
            &page.path,
            page.depth,
            page.position,
        )
        .await
        .map_err(|e| map_unique(e, "page path"))?;
        BlockRepo::replace_for_page(&mut tx, row.id, &page.content).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn get_page(&self, id: DbId) -> StoreResult<Option<Page>> {
        Ok(PageRepo::find_by_id(&self.pool, id).await?)
    }

    async fn get_page_by_path(&self, space_id: DbId, path: &str) -> StoreResult<Option<Page>> {
        Ok(PageRepo::find_by_path(&self.pool, space_id, path).await?)
    }

    async fn list_pages(&self, space_id: DbId) -> StoreResult<Vec<Page>> {
        Ok(PageRepo::list_by_space(&self.pool, space_id).await?)
    }

    async fn list_pages_updated_since(
        &self,
        space_id: DbId,
        since: Option<Timestamp>,
    ) -> StoreResult<Vec<Page>> {
        match since {
            Some(since) => Ok(PageRepo::list_updated_since(&self.pool, space_id, since).await?),
            None => Ok(PageRepo::list_by_space(&self.pool, space_id).await?),
        }
    }

    async fn list_children(&self, space_id: DbId, parent: Option<DbId>) -> StoreResult<Vec<Page>> {
        Ok(PageRepo::list_children(&self.pool, space_id, parent).await?)
    }

    async fn get_page_content(&self, page_id: DbId) -> StoreResult<PageContent> {
        let page = PageRepo::find_by_id(&self.pool, page_id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "page",
                id: page_id,
            })?;
        let blocks = BlockRepo::list_by_page(&self.pool, page_id).await?;
        Ok(assemble_content(&page.title, &blocks))
    }

    async fn relocate_pages(&self, relocations: &[PageRelocation]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for relocation in relocations {
            PageRepo::relocate(&mut tx, relocation).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn reorder_pages(&self, orderings: &[(DbId, i32)]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for &(id, position) in orderings {
            PageRepo::set_position(&mut tx, id, position).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn soft_delete_page(&self, page_id: DbId) -> StoreResult<bool> {
        Ok(PageRepo::soft_delete(&self.pool, page_id).await?)
    }

    async fn set_page_conflict(
        &self,
        page_id: DbId,
        local: &PageContent,
        remote: &PageContent,
    ) -> StoreResult<()> {
        let updated = PageRepo::set_conflict(&self.pool, page_id, local, remote).await?;
        if !updated {
            return Err(StoreError::NotFound {
                entity: "page",
                id: page_id,
            });
        }
        Ok(())
    }

    async fn clear_page_conflict(&self, page_id: DbId) -> StoreResult<()> {
        let updated = PageRepo::clear_conflict(&self.pool, page_id).await?;
        if !updated {
            return Err(StoreError::NotFound {
                entity: "page",
                id: page_id,
            });
        }
        Ok(())
    }

    async fn count_conflicted_pages(&self, space_id: DbId) -> StoreResult<i64> {
        Ok(PageRepo::count_conflicted(&self.pool, space_id).await?)
    }
}

// ---------------------------------------------------------------------------
// VersionStore
// ---------------------------------------------------------------------------

#[async_trait]
impl VersionStore for PgStore {
    async fn update_page_content(
        &self,
        page_id: DbId,
        content: &PageContent,
        author: Option<DbId>,
        note: Option<&str>,
        commit_sha: Option<&str>,
    ) -> StoreResult<PageVersion> {
        let page = PageRepo::find_by_id(&self.pool, page_id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "page",
                id: page_id,
            })?;

        let mut tx = self.pool.begin().await?;

        // Snapshot the content as it is *before* this update.
        let blocks = BlockRepo::list_by_page_in_tx(&mut tx, page_id).await?;
        let previous = assemble_content(&page.title, &blocks);
        let snapshot = serde_json::to_value(&previous)
            .map_err(|e| StoreError::Internal(format!("content encoding failed: {e}")))?;
        let version =
            PageVersionRepo::snapshot(&mut tx, page_id, &snapshot, author, note, commit_sha)
                .await?;

        BlockRepo::replace_for_page(&mut tx, page_id, content).await?;
        PageRepo::set_title(&mut tx, page_id, &content.title).await?;

        tx.commit().await?;
        Ok(version)
    }

    async fn list_versions(&self, page_id: DbId) -> StoreResult<Vec<PageVersion>> {
        Ok(PageVersionRepo::list_by_page(&self.pool, page_id).await?)
    }

    async fn get_version(&self, page_id: DbId, number: i32) -> StoreResult<Option<PageVersion>> {
        Ok(PageVersionRepo::find_by_number(&self.pool, page_id, number).await?)
    }
}

// ---------------------------------------------------------------------------
// SyncStore
// ---------------------------------------------------------------------------

#[async_trait]
impl SyncStore for PgStore {
    async fn create_sync_config(&self, config: NewSyncConfig) -> StoreResult<GitSyncConfig> {
        GitSyncConfigRepo::create(&self.pool, &config)
            .await
            .map_err(|e| map_unique(e, "sync config for space"))
    }

    async fn get_sync_config(&self, id: DbId) -> StoreResult<Option<GitSyncConfig>> {
        Ok(GitSyncConfigRepo::find_by_id(&self.pool, id).await?)
    }

    async fn get_sync_config_for_space(
        &self,
        space_id: DbId,
    ) -> StoreResult<Option<GitSyncConfig>> {
        Ok(GitSyncConfigRepo::find_by_space(&self.pool, space_id).await?)
    }

    async fn try_begin_sync(&self, config_id: DbId) -> StoreResult<bool> {
        Ok(GitSyncConfigRepo::try_begin_sync(&self.pool, config_id).await?)
    }

    async fn finish_sync(
        &self,
        config_id: DbId,
        status: SyncStatus,
        new_last_commit: Option<&str>,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let updated = GitSyncConfigRepo::finish_sync(
            &self.pool,
            config_id,
            status.as_str(),
            new_last_commit,
            error,
        )
        .await?;
        if !updated {
            return Err(StoreError::NotFound {
                entity: "sync config",
                id: config_id,
            });
        }
        Ok(())
    }

    async fn list_stuck_syncs(&self, stuck_before: Timestamp) -> StoreResult<Vec<GitSyncConfig>> {
        Ok(GitSyncConfigRepo::list_stuck(&self.pool, stuck_before).await?)
    }

    async fn record_commit(&self, commit: NewCommitRecord) -> StoreResult<bool> {
        Ok(GitCommitRepo::record(&self.pool, &commit).await?)
    }

    async fn list_commits(&self, config_id: DbId) -> StoreResult<Vec<GitCommitRecord>> {
        Ok(GitCommitRepo::list_by_config(&self.pool, config_id).await?)
    }

    async fn upsert_branch(
        &self,
        config_id: DbId,
        name: &str,
        head_sha: Option<&str>,
        is_default: bool,
    ) -> StoreResult<GitBranch> {
        Ok(GitBranchRepo::upsert(&self.pool, config_id, name, head_sha, is_default).await?)
    }

    async fn list_branches(&self, config_id: DbId) -> StoreResult<Vec<GitBranch>> {
        Ok(GitBranchRepo::list_by_config(&self.pool, config_id).await?)
    }

    async fn create_sync_history(&self, history: NewSyncHistory) -> StoreResult<SyncHistory> {
        Ok(SyncHistoryRepo::create(&self.pool, &history).await?)
    }

    async fn complete_sync_history(
        &self,
        id: DbId,
        status: SyncRunStatus,
        end_commit: Option<&str>,
        counts: SyncCounts,
        error: Option<&str>,
    ) -> StoreResult<SyncHistory> {
        let completed =
            SyncHistoryRepo::complete(&self.pool, id, status.as_str(), end_commit, counts, error)
                .await?;
        match completed {
            Some(row) => Ok(row),
            // Already completed: return the row as-is, never remutate it.
            None => {
                tracing::debug!(history_id = id, "sync history already completed");
                SyncHistoryRepo::find_by_id(&self.pool, id)
                    .await?
                    .ok_or(StoreError::NotFound {
                        entity: "sync history",
                        id,
                    })
            }
        }
    }

    async fn get_sync_history(&self, id: DbId) -> StoreResult<Option<SyncHistory>> {
        Ok(SyncHistoryRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_histories(&self, config_id: DbId) -> StoreResult<Vec<SyncHistory>> {
        Ok(SyncHistoryRepo::list_by_config(&self.pool, config_id).await?)
    }

    async fn find_running_histories(&self, config_id: DbId) -> StoreResult<Vec<SyncHistory>> {
        Ok(SyncHistoryRepo::list_running(&self.pool, config_id).await?)
    }
}

// ---------------------------------------------------------------------------
// ChangeRequestStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ChangeRequestStore for PgStore {
    async fn create_change_request(
        &self,
        change_request: NewChangeRequest,
    ) -> StoreResult<ChangeRequest> {
        Ok(ChangeRequestRepo::create(&self.pool, &change_request).await?)
    }

    async fn get_change_request(&self, id: DbId) -> StoreResult<Option<ChangeRequest>> {
        Ok(ChangeRequestRepo::find_by_id(&self.pool, id).await?)
    }

    async fn set_change_request_status(
        &self,
        id: DbId,
        status: &str,
    ) -> StoreResult<ChangeRequest> {
        ChangeRequestRepo::set_status(&self.pool, id, status)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "change request",
                id,
            })
    }

    async fn mark_merged(
        &self,
        id: DbId,
        merged_by: DbId,
        commit_sha: &str,
    ) -> StoreResult<ChangeRequest> {
        ChangeRequestRepo::mark_merged(&self.pool, id, merged_by, commit_sha)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "change request",
                id,
            })
    }

    async fn add_change(&self, change: NewChange) -> StoreResult<ChangeRequestChange> {
        Ok(ChangeRequestRepo::add_change(&self.pool, &change).await?)
    }

    async fn list_changes(
        &self,
        change_request_id: DbId,
    ) -> StoreResult<Vec<ChangeRequestChange>> {
        Ok(ChangeRequestRepo::list_changes(&self.pool, change_request_id).await?)
    }

    async fn set_change_conflict(&self, change_id: DbId, has_conflict: bool) -> StoreResult<()> {
        let updated =
            ChangeRequestRepo::set_change_conflict(&self.pool, change_id, has_conflict).await?;
        if !updated {
            return Err(StoreError::NotFound {
                entity: "change request change",
                id: change_id,
            });
        }
        Ok(())
    }

    async fn upsert_review(
        &self,
        change_request_id: DbId,
        reviewer_id: DbId,
        status: &str,
        note: Option<&str>,
    ) -> StoreResult<Review> {
        Ok(ReviewRepo::upsert(&self.pool, change_request_id, reviewer_id, status, note).await?)
    }

    async fn list_reviews(&self, change_request_id: DbId) -> StoreResult<Vec<Review>> {
        Ok(ReviewRepo::list_by_change_request(&self.pool, change_request_id).await?)
    }
}
