//! Change request workflow: review state machine, approvals, and merge.

use std::collections::HashMap;
use std::sync::Arc;

use leafpress_core::change_request::{
    check_mergeable, transition, Actor, ChangeRequestAction, ChangeRequestStatus, ReviewStatus,
};
use leafpress_core::content::PageContent;
use leafpress_core::diff::diff_content;
use leafpress_core::error::CoreError;
use leafpress_core::markdown;
use leafpress_core::slug::{parent_path, path_depth, slug_from_path, validate_title};
use leafpress_core::sync::SyncDirection;
use leafpress_core::types::DbId;
use leafpress_db::models::{
    ChangeRequest, ChangeRequestChange, NewChange, NewChangeRequest, NewCommitRecord, NewPage,
    Review, CHANGE_TYPE_CREATE, CHANGE_TYPE_DELETE, CHANGE_TYPE_UPDATE,
};
use leafpress_db::store::Store;
use leafpress_events::{DomainEvent, EventBus};
use leafpress_git::{with_retry, GitHost, NewCommit, NewFile, RetryPolicy};
use tokio::sync::Mutex;

use crate::config::EngineConfig;

/// Orchestrates the change request review and merge workflow.
pub struct ChangeRequestService {
    store: Arc<dyn Store>,
    host: Arc<dyn GitHost>,
    bus: Arc<EventBus>,
    retry: RetryPolicy,
    commit_author: String,
    /// One async mutex per (space, target branch); merges into the same
    /// target serialize, merges into different targets proceed in
    /// parallel.
    merge_locks: Mutex<HashMap<(DbId, String), Arc<Mutex<()>>>>,
}

impl ChangeRequestService {
    pub fn new(
        store: Arc<dyn Store>,
        host: Arc<dyn GitHost>,
        bus: Arc<EventBus>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            host,
            bus,
            retry: config.retry.clone(),
            commit_author: config.commit_author.clone(),
            merge_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open a change request; it starts as a draft owned by its creator.
    pub async fn create(&self, input: NewChangeRequest) -> Result<ChangeRequest, CoreError> {
        validate_title(&input.title)?;
        self.store
            .get_space(input.space_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "space",
                id: input.space_id,
            })?;
        let change_request = self
            .store
            .create_change_request(input)
            .await
            .map_err(CoreError::from)?;

        tracing::info!(change_request_id = change_request.id, "Change request opened");
        self.bus.publish(
            DomainEvent::new("change_request.created")
                .with_source("change_request", change_request.id)
                .with_actor(change_request.created_by),
        );
        Ok(change_request)
    }

    pub async fn get(&self, id: DbId) -> Result<ChangeRequest, CoreError> {
        self.require(id).await
    }

    /// Record one page's proposed change on an open change request. The
    /// line diff of the serialized before/after forms is stored alongside
    /// for review display.
    pub async fn record_change(
        &self,
        change_request_id: DbId,
        page_id: Option<DbId>,
        page_path: &str,
        change_type: &str,
        before: Option<PageContent>,
        after: Option<PageContent>,
    ) -> Result<ChangeRequestChange, CoreError> {
        let change_request = self.require(change_request_id).await?;
        let status = ChangeRequestStatus::parse(&change_request.status)?;
        if status.is_terminal() {
            return Err(CoreError::Forbidden(format!(
                "Cannot add changes to a {} change request",
                status.as_str()
            )));
        }

        let diff = diff_content(before.as_ref(), after.as_ref());
        self.store
            .add_change(NewChange {
                change_request_id,
                page_id,
                page_path: page_path.to_string(),
                change_type: change_type.to_string(),
                content_before: before.as_ref().map(encode_content).transpose()?,
                content_after: after.as_ref().map(encode_content).transpose()?,
                block_diff: serde_json::to_value(&diff)
                    .map_err(|e| CoreError::Internal(format!("diff encoding failed: {e}")))?,
            })
            .await
            .map_err(CoreError::from)
    }

    /// Assign a reviewer by seeding their pending review row.
    pub async fn assign_reviewer(
        &self,
        change_request_id: DbId,
        reviewer_id: DbId,
    ) -> Result<Review, CoreError> {
        let change_request = self.require(change_request_id).await?;
        let status = ChangeRequestStatus::parse(&change_request.status)?;
        if status.is_terminal() {
            return Err(CoreError::Forbidden(format!(
                "Cannot assign reviewers to a {} change request",
                status.as_str()
            )));
        }
        self.store
            .upsert_review(
                change_request_id,
                reviewer_id,
                ReviewStatus::Pending.as_str(),
                None,
            )
            .await
            .map_err(CoreError::from)
    }

    /// Apply a workflow action as `user_id`. Legality is decided by the
    /// state machine from the actor's relationship to the change request;
    /// approve/reject also record the reviewer's verdict.
    pub async fn apply_action(
        &self,
        change_request_id: DbId,
        action: ChangeRequestAction,
        user_id: DbId,
        note: Option<&str>,
    ) -> Result<ChangeRequest, CoreError> {
        let change_request = self.require(change_request_id).await?;
        let actor = self.actor_for(&change_request, user_id).await?;
        let current = ChangeRequestStatus::parse(&change_request.status)?;
        let next = transition(current, action, actor)?;

        match action {
            ChangeRequestAction::Approve => {
                self.store
                    .upsert_review(
                        change_request_id,
                        user_id,
                        ReviewStatus::Approved.as_str(),
                        note,
                    )
                    .await
                    .map_err(CoreError::from)?;
            }
            ChangeRequestAction::Reject => {
                self.store
                    .upsert_review(
                        change_request_id,
                        user_id,
                        ReviewStatus::ChangesRequested.as_str(),
                        note,
                    )
                    .await
                    .map_err(CoreError::from)?;
            }
            _ => {}
        }

        let updated = self
            .store
            .set_change_request_status(change_request_id, next.as_str())
            .await
            .map_err(CoreError::from)?;

        tracing::info!(
            change_request_id,
            from = current.as_str(),
            to = next.as_str(),
            "Change request transitioned"
        );
        self.bus.publish(
            DomainEvent::new("change_request.status_changed")
                .with_source("change_request", change_request_id)
                .with_actor(user_id)
                .with_payload(serde_json::json!({
                    "from": current.as_str(),
                    "to": next.as_str(),
                })),
        );
        Ok(updated)
    }

    /// Merge an approved change request into its target branch.
    ///
    /// Serialized per (space, target branch). The commit on the
    /// collaborator happens first; a rejected commit aborts with the
    /// store unchanged. Page updates then apply one versioned change at
    /// a time, and the request turns `merged` with the merge commit sha.
    pub async fn merge(
        &self,
        change_request_id: DbId,
        user_id: DbId,
    ) -> Result<ChangeRequest, CoreError> {
        let change_request = self.require(change_request_id).await?;
        let lock = self
            .merge_lock(change_request.space_id, &change_request.target_branch)
            .await;
        let _guard = lock.lock().await;

        // Re-read under the lock; a racing merge may have settled first.
        let change_request = self.require(change_request_id).await?;
        let status = ChangeRequestStatus::parse(&change_request.status)?;
        let space = self
            .store
            .get_space(change_request.space_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "space",
                id: change_request.space_id,
            })?;
        check_mergeable(status, space.required_approvals)?;

        let changes = self
            .store
            .list_changes(change_request_id)
            .await
            .map_err(CoreError::from)?;
        if changes.iter().any(|c| c.has_conflict) {
            return Err(CoreError::Conflict(format!(
                "Change request {change_request_id} has unresolved conflicts"
            )));
        }

        let sync_config = self
            .store
            .get_sync_config_for_space(change_request.space_id)
            .await
            .map_err(CoreError::from)?;
        let root_path = sync_config
            .as_ref()
            .map(|c| c.root_path.clone())
            .unwrap_or_default();

        // Commit to the repository first; rejection aborts cleanly.
        let mut files = Vec::with_capacity(changes.len());
        for change in &changes {
            let content = match &change.content_after {
                Some(value) => Some(decode_content(value)?),
                None => None,
            };
            files.push(NewFile {
                path: markdown::file_path(&root_path, &change.page_path),
                content: content.as_ref().map(markdown::serialize),
            });
        }
        let message = format!("Merge change request: {}", change_request.title);
        let commit = NewCommit {
            message: message.clone(),
            author: self.commit_author.clone(),
            files,
        };
        let sha = with_retry(&self.retry, "create_commit", || {
            self.host.create_commit(commit.clone())
        })
        .await
        .map_err(|e| CoreError::External(e.to_string()))?;

        for change in &changes {
            self.apply_change(&change_request, change, user_id, &sha)
                .await?;
        }

        if let Some(config) = &sync_config {
            self.store
                .record_commit(NewCommitRecord {
                    config_id: config.id,
                    sha: sha.clone(),
                    direction: SyncDirection::Push.as_str().to_string(),
                    change_request_id: Some(change_request_id),
                    files_changed: changes.len() as i32,
                    message,
                })
                .await
                .map_err(CoreError::from)?;
        }

        let merged = self
            .store
            .mark_merged(change_request_id, user_id, &sha)
            .await
            .map_err(CoreError::from)?;

        tracing::info!(change_request_id, sha = %sha, "Change request merged");
        self.bus.publish(
            DomainEvent::new("change_request.merged")
                .with_source("change_request", change_request_id)
                .with_actor(user_id)
                .with_payload(serde_json::json!({ "commit": sha })),
        );
        Ok(merged)
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn require(&self, id: DbId) -> Result<ChangeRequest, CoreError> {
        self.store
            .get_change_request(id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "change request",
                id,
            })
    }

    async fn actor_for(
        &self,
        change_request: &ChangeRequest,
        user_id: DbId,
    ) -> Result<Actor, CoreError> {
        let reviews = self
            .store
            .list_reviews(change_request.id)
            .await
            .map_err(CoreError::from)?;
        Ok(Actor {
            user_id,
            is_creator: change_request.created_by == user_id,
            is_reviewer: reviews.iter().any(|r| r.reviewer_id == user_id),
        })
    }

    async fn merge_lock(&self, space_id: DbId, target_branch: &str) -> Arc<Mutex<()>> {
        let mut locks = self.merge_locks.lock().await;
        locks
            .entry((space_id, target_branch.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Apply one merged change to the store as a versioned update.
    async fn apply_change(
        &self,
        change_request: &ChangeRequest,
        change: &ChangeRequestChange,
        user_id: DbId,
        sha: &str,
    ) -> Result<(), CoreError> {
        let note = format!("Merged change request: {}", change_request.title);
        match change.change_type.as_str() {
            CHANGE_TYPE_CREATE => {
                let value = change.content_after.as_ref().ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Create change for {} carries no content",
                        change.page_path
                    ))
                })?;
                let content = decode_content(value)?;
                self.create_page_at(change_request.space_id, &change.page_path, content)
                    .await?;
            }
            CHANGE_TYPE_UPDATE => {
                let page_id = change.page_id.ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Update change for {} references no page",
                        change.page_path
                    ))
                })?;
                let value = change.content_after.as_ref().ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Update change for {} carries no content",
                        change.page_path
                    ))
                })?;
                let content = decode_content(value)?;
                self.store
                    .update_page_content(page_id, &content, Some(user_id), Some(&note), Some(sha))
                    .await
                    .map_err(CoreError::from)?;
            }
            CHANGE_TYPE_DELETE => {
                if let Some(page_id) = change.page_id {
                    self.store
                        .soft_delete_page(page_id)
                        .await
                        .map_err(CoreError::from)?;
                }
            }
            other => {
                return Err(CoreError::Internal(format!(
                    "Unknown change type '{other}'"
                )));
            }
        }
        Ok(())
    }

    async fn create_page_at(
        &self,
        space_id: DbId,
        page_path: &str,
        content: PageContent,
    ) -> Result<(), CoreError> {
        let parent = match parent_path(page_path) {
            Some(parent) => self
                .store
                .get_page_by_path(space_id, parent)
                .await
                .map_err(CoreError::from)?
                .map(|p| p.id),
            None => None,
        };
        let position = self
            .store
            .list_children(space_id, parent)
            .await
            .map_err(CoreError::from)?
            .len() as i32;
        self.store
            .create_page(NewPage {
                space_id,
                parent_page_id: parent,
                slug: slug_from_path(page_path).to_string(),
                path: page_path.to_string(),
                depth: path_depth(page_path),
                position,
                content,
            })
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }
}

fn encode_content(content: &PageContent) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(content)
        .map_err(|e| CoreError::Internal(format!("content encoding failed: {e}")))
}

fn decode_content(value: &serde_json::Value) -> Result<PageContent, CoreError> {
    serde_json::from_value(value.clone())
        .map_err(|e| CoreError::Internal(format!("Stored content snapshot is invalid: {e}")))
}
