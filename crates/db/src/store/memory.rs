//! In-memory store backend.
//!
//! Backs the engine in tests and database-free embeddings. State lives
//! in id-keyed arenas behind one async mutex; every method takes the
//! lock once, so each store call is atomic exactly like its Postgres
//! counterpart. Page content is kept as flat block rows and converted
//! through the same [`flatten_content`]/[`assemble_content`] helpers the
//! Postgres backend uses.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use leafpress_core::content::PageContent;
use leafpress_core::sync::{SyncRunStatus, SyncStatus};
use leafpress_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;

use crate::models::{
    assemble_content, flatten_content, Block, ChangeRequest, ChangeRequestChange, GitBranch,
    GitCommitRecord, GitSyncConfig, NewChange, NewChangeRequest, NewCommitRecord, NewPage,
    NewSpace, NewSyncConfig, NewSyncHistory, Page, PageRelocation, PageVersion, Review, Space,
    SyncCounts, SyncHistory,
};
use crate::store::{
    ChangeRequestStore, PageStore, StoreError, StoreResult, SyncStore, VersionStore,
};

#[derive(Default)]
struct MemState {
    next_id: DbId,
    spaces: HashMap<DbId, Space>,
    pages: HashMap<DbId, Page>,
    /// Flat block rows per page, parent rows before children.
    blocks: HashMap<DbId, Vec<Block>>,
    /// Version log per page, ascending by number.
    versions: HashMap<DbId, Vec<PageVersion>>,
    configs: HashMap<DbId, GitSyncConfig>,
    commits: Vec<GitCommitRecord>,
    branches: HashMap<DbId, GitBranch>,
    histories: HashMap<DbId, SyncHistory>,
    change_requests: HashMap<DbId, ChangeRequest>,
    changes: HashMap<DbId, ChangeRequestChange>,
    reviews: HashMap<DbId, Review>,
}

impl MemState {
    fn alloc_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn live_page(&self, id: DbId) -> Option<&Page> {
        self.pages.get(&id).filter(|p| p.deleted_at.is_none())
    }

    fn set_blocks(&mut self, page_id: DbId, content: &PageContent) {
        let flat = flatten_content(content);
        let mut rows = Vec::with_capacity(flat.len());
        let mut ids: Vec<DbId> = Vec::with_capacity(flat.len());
        let now = Utc::now();
        for block in &flat {
            let id = self.alloc_id();
            rows.push(Block {
                id,
                page_id,
                parent_block_id: block.parent_idx.map(|idx| ids[idx]),
                block_type: block.block_type.clone(),
                position: block.position,
                content: block.content.clone(),
                ref_block_id: block.ref_block_id,
                created_at: now,
                updated_at: now,
            });
            ids.push(id);
        }
        self.blocks.insert(page_id, rows);
    }

    fn content_of(&self, page: &Page) -> PageContent {
        let rows = self.blocks.get(&page.id).map(Vec::as_slice).unwrap_or(&[]);
        assemble_content(&page.title, rows)
    }
}

/// [`Store`](crate::store::Store) backend over in-process arenas.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// PageStore
// ---------------------------------------------------------------------------

#[async_trait]
impl PageStore for MemoryStore {
    async fn create_space(&self, space: NewSpace) -> StoreResult<Space> {
        let mut state = self.state.lock().await;
        if state
            .spaces
            .values()
            .any(|s| s.slug == space.slug && s.deleted_at.is_none())
        {
            return Err(StoreError::Conflict("space slug already exists".into()));
        }
        let now = Utc::now();
        let id = state.alloc_id();
        let row = Space {
            id,
            name: space.name,
            slug: space.slug,
            required_approvals: space.required_approvals.unwrap_or(1),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.spaces.insert(id, row.clone());
        Ok(row)
    }

    async fn get_space(&self, id: DbId) -> StoreResult<Option<Space>> {
        let state = self.state.lock().await;
        Ok(state
            .spaces
            .get(&id)
            .filter(|s| s.deleted_at.is_none())
            .cloned())
    }

    async fn create_page(&self, page: NewPage) -> StoreResult<Page> {
        let mut state = self.state.lock().await;
        if state
            .pages
            .values()
            .any(|p| p.space_id == page.space_id && p.path == page.path && p.deleted_at.is_none())
        {
            return Err(StoreError::Conflict("page path already exists".into()));
        }
        let now = Utc::now();
        let id = state.alloc_id();
        let row = Page {
            id,
            space_id: page.space_id,
            parent_page_id: page.parent_page_id,
            slug: page.slug,
            title: page.content.title.clone(),
            path: page.path,
            depth: page.depth,
            position: page.position,
            is_published: false,
            has_conflict: false,
            conflict_local: None,
            conflict_remote: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.set_blocks(id, &page.content);
        state.pages.insert(id, row.clone());
        Ok(row)
    }

    async fn get_page(&self, id: DbId) -> StoreResult<Option<Page>> {
        let state = self.state.lock().await;
        Ok(state.live_page(id).cloned())
    }

    async fn get_page_by_path(&self, space_id: DbId, path: &str) -> StoreResult<Option<Page>> {
        let state = self.state.lock().await;
        Ok(state
            .pages
            .values()
            .find(|p| p.space_id == space_id && p.path == path && p.deleted_at.is_none())
            .cloned())
    }

    async fn list_pages(&self, space_id: DbId) -> StoreResult<Vec<Page>> {
        let state = self.state.lock().await;
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|p| p.space_id == space_id && p.deleted_at.is_none())
            .cloned()
            .collect();
        pages.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(pages)
    }

    async fn list_pages_updated_since(
        &self,
        space_id: DbId,
        since: Option<Timestamp>,
    ) -> StoreResult<Vec<Page>> {
        let state = self.state.lock().await;
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|p| p.space_id == space_id && p.deleted_at.is_none())
            .filter(|p| since.is_none_or(|t| p.updated_at > t))
            .cloned()
            .collect();
        pages.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(pages)
    }

    async fn list_children(&self, space_id: DbId, parent: Option<DbId>) -> StoreResult<Vec<Page>> {
        let state = self.state.lock().await;
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|p| {
                p.space_id == space_id && p.parent_page_id == parent && p.deleted_at.is_none()
            })
            .cloned()
            .collect();
        pages.sort_by_key(|p| p.position);
        Ok(pages)
    }

    async fn get_page_content(&self, page_id: DbId) -> StoreResult<PageContent> {
        let state = self.state.lock().await;
        let page = state.live_page(page_id).ok_or(StoreError::NotFound {
            entity: "page",
            id: page_id,
        })?;
        Ok(state.content_of(page))
    }

    async fn relocate_pages(&self, relocations: &[PageRelocation]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        for relocation in relocations {
            let page =
                state
                    .pages
                    .get_mut(&relocation.page_id)
                    .ok_or(StoreError::NotFound {
                        entity: "page",
                        id: relocation.page_id,
                    })?;
            page.parent_page_id = relocation.parent_page_id;
            page.path = relocation.path.clone();
            page.depth = relocation.depth;
            page.position = relocation.position;
            page.updated_at = now;
        }
        Ok(())
    }

    async fn reorder_pages(&self, orderings: &[(DbId, i32)]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        for &(id, position) in orderings {
            let page = state.pages.get_mut(&id).ok_or(StoreError::NotFound {
                entity: "page",
                id,
            })?;
            page.position = position;
            page.updated_at = now;
        }
        Ok(())
    }

    async fn soft_delete_page(&self, page_id: DbId) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.pages.get_mut(&page_id) {
            Some(page) if page.deleted_at.is_none() => {
                page.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_page_conflict(
        &self,
        page_id: DbId,
        local: &PageContent,
        remote: &PageContent,
    ) -> StoreResult<()> {
        let local = serde_json::to_value(local)
            .map_err(|e| StoreError::Internal(format!("content encoding failed: {e}")))?;
        let remote = serde_json::to_value(remote)
            .map_err(|e| StoreError::Internal(format!("content encoding failed: {e}")))?;
        let mut state = self.state.lock().await;
        let page = state
            .pages
            .get_mut(&page_id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or(StoreError::NotFound {
                entity: "page",
                id: page_id,
            })?;
        page.has_conflict = true;
        page.conflict_local = Some(local);
        page.conflict_remote = Some(remote);
        page.updated_at = Utc::now();
        Ok(())
    }

    async fn clear_page_conflict(&self, page_id: DbId) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let page = state.pages.get_mut(&page_id).ok_or(StoreError::NotFound {
            entity: "page",
            id: page_id,
        })?;
        page.has_conflict = false;
        page.conflict_local = None;
        page.conflict_remote = None;
        page.updated_at = Utc::now();
        Ok(())
    }

    async fn count_conflicted_pages(&self, space_id: DbId) -> StoreResult<i64> {
        let state = self.state.lock().await;
        Ok(state
            .pages
            .values()
            .filter(|p| p.space_id == space_id && p.has_conflict && p.deleted_at.is_none())
            .count() as i64)
    }
}

// ---------------------------------------------------------------------------
// VersionStore
// ---------------------------------------------------------------------------

#[async_trait]
impl VersionStore for MemoryStore {
    async fn update_page_content(
        &self,
        page_id: DbId,
        content: &PageContent,
        author: Option<DbId>,
        note: Option<&str>,
        commit_sha: Option<&str>,
    ) -> StoreResult<PageVersion> {
        let mut state = self.state.lock().await;
        let page = state.live_page(page_id).cloned().ok_or(StoreError::NotFound {
            entity: "page",
            id: page_id,
        })?;

        let previous = state.content_of(&page);
        let snapshot = serde_json::to_value(&previous)
            .map_err(|e| StoreError::Internal(format!("content encoding failed: {e}")))?;

        let version_number = state
            .versions
            .get(&page_id)
            .and_then(|log| log.last())
            .map(|v| v.version_number + 1)
            .unwrap_or(1);
        let id = state.alloc_id();
        let version = PageVersion {
            id,
            page_id,
            version_number,
            content: snapshot,
            created_by: author,
            change_note: note.map(str::to_string),
            git_commit_sha: commit_sha.map(str::to_string),
            created_at: Utc::now(),
        };
        state
            .versions
            .entry(page_id)
            .or_default()
            .push(version.clone());

        state.set_blocks(page_id, content);
        if let Some(page) = state.pages.get_mut(&page_id) {
            page.title = content.title.clone();
            page.updated_at = Utc::now();
        }
        Ok(version)
    }

    async fn list_versions(&self, page_id: DbId) -> StoreResult<Vec<PageVersion>> {
        let state = self.state.lock().await;
        let mut log = state.versions.get(&page_id).cloned().unwrap_or_default();
        log.reverse();
        Ok(log)
    }

    async fn get_version(&self, page_id: DbId, number: i32) -> StoreResult<Option<PageVersion>> {
        let state = self.state.lock().await;
        Ok(state
            .versions
            .get(&page_id)
            .and_then(|log| log.iter().find(|v| v.version_number == number))
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// SyncStore
// ---------------------------------------------------------------------------

#[async_trait]
impl SyncStore for MemoryStore {
    async fn create_sync_config(&self, config: NewSyncConfig) -> StoreResult<GitSyncConfig> {
        let mut state = self.state.lock().await;
        if state
            .configs
            .values()
            .any(|c| c.space_id == config.space_id)
        {
            return Err(StoreError::Conflict(
                "sync config for space already exists".into(),
            ));
        }
        let now = Utc::now();
        let id = state.alloc_id();
        let row = GitSyncConfig {
            id,
            space_id: config.space_id,
            repository: config.repository,
            default_branch: config.default_branch,
            root_path: config.root_path,
            include_patterns: config.include_patterns,
            exclude_patterns: config.exclude_patterns,
            sync_status: SyncStatus::Idle.as_str().to_string(),
            last_sync_commit: None,
            last_synced_at: None,
            sync_started_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        state.configs.insert(id, row.clone());
        Ok(row)
    }

    async fn get_sync_config(&self, id: DbId) -> StoreResult<Option<GitSyncConfig>> {
        let state = self.state.lock().await;
        Ok(state.configs.get(&id).cloned())
    }

    async fn get_sync_config_for_space(
        &self,
        space_id: DbId,
    ) -> StoreResult<Option<GitSyncConfig>> {
        let state = self.state.lock().await;
        Ok(state
            .configs
            .values()
            .find(|c| c.space_id == space_id)
            .cloned())
    }

    async fn try_begin_sync(&self, config_id: DbId) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.configs.get_mut(&config_id) {
            Some(config) if config.sync_status != SyncStatus::Syncing.as_str() => {
                config.sync_status = SyncStatus::Syncing.as_str().to_string();
                config.sync_started_at = Some(Utc::now());
                config.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finish_sync(
        &self,
        config_id: DbId,
        status: SyncStatus,
        new_last_commit: Option<&str>,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let config = state
            .configs
            .get_mut(&config_id)
            .ok_or(StoreError::NotFound {
                entity: "sync config",
                id: config_id,
            })?;
        config.sync_status = status.as_str().to_string();
        config.sync_started_at = None;
        if let Some(sha) = new_last_commit {
            config.last_sync_commit = Some(sha.to_string());
        }
        if status == SyncStatus::Success {
            config.last_synced_at = Some(Utc::now());
        }
        config.last_error = error.map(str::to_string);
        config.updated_at = Utc::now();
        Ok(())
    }

    async fn list_stuck_syncs(&self, stuck_before: Timestamp) -> StoreResult<Vec<GitSyncConfig>> {
        let state = self.state.lock().await;
        Ok(state
            .configs
            .values()
            .filter(|c| {
                c.sync_status == SyncStatus::Syncing.as_str()
                    && c.sync_started_at.is_some_and(|t| t < stuck_before)
            })
            .cloned()
            .collect())
    }

    async fn record_commit(&self, commit: NewCommitRecord) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        if state
            .commits
            .iter()
            .any(|c| c.config_id == commit.config_id && c.sha == commit.sha)
        {
            return Ok(false);
        }
        let id = state.alloc_id();
        state.commits.push(GitCommitRecord {
            id,
            config_id: commit.config_id,
            sha: commit.sha,
            direction: commit.direction,
            change_request_id: commit.change_request_id,
            files_changed: commit.files_changed,
            message: commit.message,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_commits(&self, config_id: DbId) -> StoreResult<Vec<GitCommitRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .commits
            .iter()
            .filter(|c| c.config_id == config_id)
            .rev()
            .cloned()
            .collect())
    }

    async fn upsert_branch(
        &self,
        config_id: DbId,
        name: &str,
        head_sha: Option<&str>,
        is_default: bool,
    ) -> StoreResult<GitBranch> {
        let mut state = self.state.lock().await;
        if is_default {
            for branch in state.branches.values_mut() {
                if branch.config_id == config_id && branch.name != name {
                    branch.is_default = false;
                }
            }
        }
        let now = Utc::now();
        let existing = state
            .branches
            .values_mut()
            .find(|b| b.config_id == config_id && b.name == name);
        if let Some(branch) = existing {
            if let Some(sha) = head_sha {
                branch.head_sha = Some(sha.to_string());
            }
            branch.is_default = is_default;
            branch.updated_at = now;
            return Ok(branch.clone());
        }
        let id = state.alloc_id();
        let branch = GitBranch {
            id,
            config_id,
            name: name.to_string(),
            head_sha: head_sha.map(str::to_string),
            is_default,
            created_at: now,
            updated_at: now,
        };
        state.branches.insert(id, branch.clone());
        Ok(branch)
    }

    async fn list_branches(&self, config_id: DbId) -> StoreResult<Vec<GitBranch>> {
        let state = self.state.lock().await;
        let mut branches: Vec<GitBranch> = state
            .branches
            .values()
            .filter(|b| b.config_id == config_id)
            .cloned()
            .collect();
        branches.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.name.cmp(&b.name)));
        Ok(branches)
    }

    async fn create_sync_history(&self, history: NewSyncHistory) -> StoreResult<SyncHistory> {
        let mut state = self.state.lock().await;
        let id = state.alloc_id();
        let row = SyncHistory {
            id,
            config_id: history.config_id,
            operation: history.operation,
            status: SyncRunStatus::Running.as_str().to_string(),
            start_commit: history.start_commit,
            end_commit: None,
            files_processed: 0,
            pages_created: 0,
            pages_updated: 0,
            pages_deleted: 0,
            conflict_count: 0,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        state.histories.insert(id, row.clone());
        Ok(row)
    }

    async fn complete_sync_history(
        &self,
        id: DbId,
        status: SyncRunStatus,
        end_commit: Option<&str>,
        counts: SyncCounts,
        error: Option<&str>,
    ) -> StoreResult<SyncHistory> {
        let mut state = self.state.lock().await;
        let row = state.histories.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "sync history",
            id,
        })?;
        // Completed rows are immutable; a late completion is a no-op.
        if row.status == SyncRunStatus::Running.as_str() {
            row.status = status.as_str().to_string();
            row.end_commit = end_commit.map(str::to_string);
            row.files_processed = counts.files_processed;
            row.pages_created = counts.pages_created;
            row.pages_updated = counts.pages_updated;
            row.pages_deleted = counts.pages_deleted;
            row.conflict_count = counts.conflict_count;
            row.error = error.map(str::to_string);
            row.finished_at = Some(Utc::now());
        }
        Ok(row.clone())
    }

    async fn get_sync_history(&self, id: DbId) -> StoreResult<Option<SyncHistory>> {
        let state = self.state.lock().await;
        Ok(state.histories.get(&id).cloned())
    }

    async fn list_histories(&self, config_id: DbId) -> StoreResult<Vec<SyncHistory>> {
        let state = self.state.lock().await;
        let mut rows: Vec<SyncHistory> = state
            .histories
            .values()
            .filter(|h| h.config_id == config_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn find_running_histories(&self, config_id: DbId) -> StoreResult<Vec<SyncHistory>> {
        let state = self.state.lock().await;
        let mut rows: Vec<SyncHistory> = state
            .histories
            .values()
            .filter(|h| {
                h.config_id == config_id && h.status == SyncRunStatus::Running.as_str()
            })
            .cloned()
            .collect();
        rows.sort_by_key(|h| h.started_at);
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// ChangeRequestStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ChangeRequestStore for MemoryStore {
    async fn create_change_request(
        &self,
        change_request: NewChangeRequest,
    ) -> StoreResult<ChangeRequest> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let id = state.alloc_id();
        let row = ChangeRequest {
            id,
            space_id: change_request.space_id,
            title: change_request.title,
            description: change_request.description,
            status: "draft".to_string(),
            source_branch: change_request.source_branch,
            target_branch: change_request.target_branch,
            created_by: change_request.created_by,
            merged_by: None,
            merged_at: None,
            merge_commit_sha: None,
            created_at: now,
            updated_at: now,
        };
        state.change_requests.insert(id, row.clone());
        Ok(row)
    }

    async fn get_change_request(&self, id: DbId) -> StoreResult<Option<ChangeRequest>> {
        let state = self.state.lock().await;
        Ok(state.change_requests.get(&id).cloned())
    }

    async fn set_change_request_status(
        &self,
        id: DbId,
        status: &str,
    ) -> StoreResult<ChangeRequest> {
        let mut state = self.state.lock().await;
        let row = state
            .change_requests
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "change request",
                id,
            })?;
        row.status = status.to_string();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn mark_merged(
        &self,
        id: DbId,
        merged_by: DbId,
        commit_sha: &str,
    ) -> StoreResult<ChangeRequest> {
        let mut state = self.state.lock().await;
        let row = state
            .change_requests
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "change request",
                id,
            })?;
        row.status = "merged".to_string();
        row.merged_by = Some(merged_by);
        row.merged_at = Some(Utc::now());
        row.merge_commit_sha = Some(commit_sha.to_string());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn add_change(&self, change: NewChange) -> StoreResult<ChangeRequestChange> {
        let mut state = self.state.lock().await;
        let id = state.alloc_id();
        let row = ChangeRequestChange {
            id,
            change_request_id: change.change_request_id,
            page_id: change.page_id,
            page_path: change.page_path,
            change_type: change.change_type,
            content_before: change.content_before,
            content_after: change.content_after,
            block_diff: change.block_diff,
            has_conflict: false,
            created_at: Utc::now(),
        };
        state.changes.insert(id, row.clone());
        Ok(row)
    }

    async fn list_changes(
        &self,
        change_request_id: DbId,
    ) -> StoreResult<Vec<ChangeRequestChange>> {
        let state = self.state.lock().await;
        let mut rows: Vec<ChangeRequestChange> = state
            .changes
            .values()
            .filter(|c| c.change_request_id == change_request_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.page_path.cmp(&b.page_path).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn set_change_conflict(&self, change_id: DbId, has_conflict: bool) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let row = state.changes.get_mut(&change_id).ok_or(StoreError::NotFound {
            entity: "change request change",
            id: change_id,
        })?;
        row.has_conflict = has_conflict;
        Ok(())
    }

    async fn upsert_review(
        &self,
        change_request_id: DbId,
        reviewer_id: DbId,
        status: &str,
        note: Option<&str>,
    ) -> StoreResult<Review> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let existing = state
            .reviews
            .values_mut()
            .find(|r| r.change_request_id == change_request_id && r.reviewer_id == reviewer_id);
        if let Some(review) = existing {
            review.status = status.to_string();
            review.note = note.map(str::to_string);
            review.updated_at = now;
            return Ok(review.clone());
        }
        let id = state.alloc_id();
        let review = Review {
            id,
            change_request_id,
            reviewer_id,
            status: status.to_string(),
            note: note.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        state.reviews.insert(id, review.clone());
        Ok(review)
    }

    async fn list_reviews(&self, change_request_id: DbId) -> StoreResult<Vec<Review>> {
        let state = self.state.lock().await;
        let mut rows: Vec<Review> = state
            .reviews
            .values()
            .filter(|r| r.change_request_id == change_request_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
