//! The sync engine: pull, push, webhook handling, and conflict
//! resolution against the git host collaborator.
//!
//! A sync run is single-flight per config: the config's `sync_status`
//! acts as the mutex and a concurrent trigger is rejected with
//! [`CoreError::Conflict`] rather than queued. `trigger_sync` returns the
//! id of a `running` history row immediately and the work proceeds on a
//! spawned task; the row always reaches a terminal status (the watchdog
//! sweeps any run that does not).

use std::collections::BTreeMap;
use std::sync::Arc;

use leafpress_core::content::PageContent;
use leafpress_core::error::CoreError;
use leafpress_core::markdown;
use leafpress_core::merge::{self, MergeOutcome, ResolutionChoice};
use leafpress_core::slug::{parent_path, path_depth, slug_from_path, title_from_slug};
use leafpress_core::sync::{SyncDirection, SyncOperation, SyncRunStatus, SyncStatus};
use leafpress_core::types::DbId;
use leafpress_db::models::{
    GitSyncConfig, NewCommitRecord, NewPage, NewSyncConfig, NewSyncHistory, Page, SyncCounts,
};
use leafpress_db::store::Store;
use leafpress_events::{DomainEvent, EventBus};
use leafpress_git::{with_retry, FileChangeKind, GitHost, GitHostError, NewCommit, NewFile};
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::EngineConfig;

/// Webhook notification body: the host tells us which commits landed.
/// Only the sha set matters; ordering and duplicates are tolerated.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub commits: Vec<String>,
}

/// Result of one pull or push pass.
#[derive(Debug, Default)]
struct RunOutcome {
    counts: SyncCounts,
    new_head: Option<String>,
}

fn host_error(err: GitHostError) -> CoreError {
    CoreError::External(err.to_string())
}

/// Orchestrates bidirectional synchronization for sync configs.
#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<dyn Store>,
    host: Arc<dyn GitHost>,
    bus: Arc<EventBus>,
    config: EngineConfig,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn Store>,
        host: Arc<dyn GitHost>,
        bus: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            host,
            bus,
            config,
        }
    }

    /// Bind a space to a repository. The binding starts `idle` with no
    /// synced commit.
    pub async fn create_config(&self, config: NewSyncConfig) -> Result<GitSyncConfig, CoreError> {
        self.store
            .get_space(config.space_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "space",
                id: config.space_id,
            })?;
        self.store
            .create_sync_config(config)
            .await
            .map_err(CoreError::from)
    }

    /// Start a sync run. Returns the id of its `running` history row;
    /// the work happens on a spawned task. A run already in flight for
    /// this config is a [`CoreError::Conflict`].
    pub async fn trigger_sync(
        &self,
        config_id: DbId,
        operation: SyncOperation,
    ) -> Result<DbId, CoreError> {
        let config = self
            .store
            .get_sync_config(config_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "sync config",
                id: config_id,
            })?;

        if !self
            .store
            .try_begin_sync(config_id)
            .await
            .map_err(CoreError::from)?
        {
            return Err(CoreError::Conflict(format!(
                "A sync is already running for config {config_id}"
            )));
        }

        let history = match self
            .store
            .create_sync_history(NewSyncHistory {
                config_id,
                operation: operation.as_str().to_string(),
                start_commit: config.last_sync_commit.clone(),
            })
            .await
        {
            Ok(history) => history,
            Err(err) => {
                // Release the mutex before surfacing the failure.
                let _ = self
                    .store
                    .finish_sync(
                        config_id,
                        SyncStatus::Error,
                        None,
                        Some("failed to open sync run"),
                    )
                    .await;
                return Err(err.into());
            }
        };

        // Correlates every log line of this run across the spawn boundary.
        let run_id = Uuid::new_v4();
        tracing::info!(
            config_id,
            history_id = history.id,
            operation = operation.as_str(),
            %run_id,
            "Sync triggered"
        );
        let engine = self.clone();
        let history_id = history.id;
        let span = tracing::info_span!("sync_run", %run_id, config_id, history_id);
        tokio::spawn(
            async move {
                engine.execute(&config, history_id, operation).await;
            }
            .instrument(span),
        );
        Ok(history_id)
    }

    /// Entry point for host webhook deliveries. A redelivery is detected
    /// through the commit ledger: when every sha in the payload is
    /// already recorded and the config is caught up, the delivery is
    /// acknowledged with `None` instead of starting a run.
    pub async fn handle_webhook(
        &self,
        config_id: DbId,
        payload: &WebhookPayload,
    ) -> Result<Option<DbId>, CoreError> {
        tracing::debug!(
            config_id,
            commits = payload.commits.len(),
            "Webhook received"
        );
        if !payload.commits.is_empty() {
            let config = self
                .store
                .get_sync_config(config_id)
                .await
                .map_err(CoreError::from)?
                .ok_or(CoreError::NotFound {
                    entity: "sync config",
                    id: config_id,
                })?;
            // Only short-circuit when the config is caught up: a config
            // at `conflict` or `error` kept its base and still needs a
            // run to re-apply the fetched range.
            if config.sync_status == SyncStatus::Success.as_str() {
                let recorded = self
                    .store
                    .list_commits(config_id)
                    .await
                    .map_err(CoreError::from)?;
                let all_known = payload
                    .commits
                    .iter()
                    .all(|sha| recorded.iter().any(|c| &c.sha == sha));
                if all_known {
                    tracing::debug!(config_id, "Webhook redelivery, every commit recorded");
                    return Ok(None);
                }
            }
        }
        self.trigger_sync(config_id, SyncOperation::Webhook)
            .await
            .map(Some)
    }

    /// Run the sync to completion and settle both the config status and
    /// the history row.
    async fn execute(&self, config: &GitSyncConfig, history_id: DbId, operation: SyncOperation) {
        let result = match operation.direction() {
            SyncDirection::Pull => self.pull(config).await,
            SyncDirection::Push => self.push(config).await,
        };

        let settle = match result {
            Ok(outcome) => {
                let conflicted = outcome.counts.conflict_count > 0;
                let (config_status, run_status) = if conflicted {
                    (SyncStatus::Conflict, SyncRunStatus::Conflict)
                } else {
                    (SyncStatus::Success, SyncRunStatus::Success)
                };
                // On conflict the synced commit stays put so resolution
                // re-evaluates against the same base.
                let advance = if conflicted {
                    None
                } else {
                    outcome.new_head.as_deref()
                };
                let settled = self
                    .settle(
                        config.id,
                        history_id,
                        config_status,
                        run_status,
                        advance,
                        outcome.new_head.as_deref(),
                        outcome.counts,
                        None,
                    )
                    .await;
                if settled.is_ok() {
                    let event_type = if conflicted {
                        "sync.conflict"
                    } else {
                        "sync.completed"
                    };
                    self.bus.publish(
                        DomainEvent::new(event_type)
                            .with_source("git_sync_config", config.id)
                            .with_payload(serde_json::json!({
                                "operation": operation.as_str(),
                                "files_processed": outcome.counts.files_processed,
                                "conflicts": outcome.counts.conflict_count,
                            })),
                    );
                    tracing::info!(
                        config_id = config.id,
                        history_id,
                        files = outcome.counts.files_processed,
                        conflicts = outcome.counts.conflict_count,
                        "Sync finished"
                    );
                }
                settled
            }
            Err(err) => {
                tracing::error!(config_id = config.id, history_id, error = %err, "Sync failed");
                let message = err.to_string();
                let settled = self
                    .settle(
                        config.id,
                        history_id,
                        SyncStatus::Error,
                        SyncRunStatus::Error,
                        None,
                        None,
                        SyncCounts::default(),
                        Some(&message),
                    )
                    .await;
                if settled.is_ok() {
                    self.bus.publish(
                        DomainEvent::new("sync.failed")
                            .with_source("git_sync_config", config.id)
                            .with_payload(serde_json::json!({ "error": message })),
                    );
                }
                settled
            }
        };

        if let Err(err) = settle {
            tracing::error!(
                config_id = config.id,
                history_id,
                error = %err,
                "Failed to settle sync run; the watchdog will sweep it"
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn settle(
        &self,
        config_id: DbId,
        history_id: DbId,
        config_status: SyncStatus,
        run_status: SyncRunStatus,
        advance: Option<&str>,
        end_commit: Option<&str>,
        counts: SyncCounts,
        error: Option<&str>,
    ) -> Result<(), CoreError> {
        self.store
            .finish_sync(config_id, config_status, advance, error)
            .await
            .map_err(CoreError::from)?;
        self.store
            .complete_sync_history(history_id, run_status, end_commit, counts, error)
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }

    // ── Pull ─────────────────────────────────────────────────────────

    /// Repository → store. Fetches commits after the last synced one,
    /// three-way-resolves every changed file under the config's root,
    /// and applies fast-forwards as versioned updates.
    async fn pull(&self, config: &GitSyncConfig) -> Result<RunOutcome, CoreError> {
        let since = config.last_sync_commit.clone();
        let commits = with_retry(&self.config.retry, "fetch_commits", || {
            self.host.fetch_commits(since.as_deref())
        })
        .await
        .map_err(host_error)?;

        if commits.is_empty() {
            return Ok(RunOutcome::default());
        }

        // Ledger the range. A sha already recorded means a previous run
        // fetched it but did not advance the synced commit (it ended in
        // conflict or error), so its files are re-applied below; the
        // three-way resolve makes re-applying a settled file a no-op.
        let mut refetched = 0;
        for commit in &commits {
            let recorded = self
                .store
                .record_commit(NewCommitRecord {
                    config_id: config.id,
                    sha: commit.sha.clone(),
                    direction: SyncDirection::Pull.as_str().to_string(),
                    change_request_id: None,
                    files_changed: commit.files.len() as i32,
                    message: commit.message.clone(),
                })
                .await
                .map_err(CoreError::from)?;
            if !recorded {
                refetched += 1;
            }
        }
        if refetched > 0 {
            tracing::debug!(
                config_id = config.id,
                refetched,
                "Re-applying previously fetched commits"
            );
        }

        // Head of the fetched range; fetch results are oldest-first.
        let head = commits
            .last()
            .map(|c| c.sha.clone())
            .unwrap_or_default();

        // Net change per file across the range: the latest kind wins.
        let mut changed: BTreeMap<String, FileChangeKind> = BTreeMap::new();
        for commit in &commits {
            for file in &commit.files {
                changed.insert(file.path.clone(), file.kind);
            }
        }

        let mut counts = SyncCounts::default();
        for (file, kind) in &changed {
            let Some(page_path) = markdown::page_path_from_file(&config.root_path, file) else {
                continue;
            };
            if !markdown::matches_filters(
                &config.include_patterns,
                &config.exclude_patterns,
                file,
            ) {
                continue;
            }
            counts.files_processed += 1;

            match kind {
                FileChangeKind::Deleted => {
                    if let Some(page) = self
                        .store
                        .get_page_by_path(config.space_id, &page_path)
                        .await
                        .map_err(CoreError::from)?
                    {
                        if self
                            .store
                            .soft_delete_page(page.id)
                            .await
                            .map_err(CoreError::from)?
                        {
                            counts.pages_deleted += 1;
                        }
                    }
                }
                FileChangeKind::Added | FileChangeKind::Modified => {
                    self.pull_file(config, file, &page_path, &head, &mut counts)
                        .await?;
                }
            }
        }

        Ok(RunOutcome {
            counts,
            new_head: Some(head),
        })
    }

    /// Resolve one added/modified file against the store.
    async fn pull_file(
        &self,
        config: &GitSyncConfig,
        file: &str,
        page_path: &str,
        head: &str,
        counts: &mut SyncCounts,
    ) -> Result<(), CoreError> {
        let remote_text = with_retry(&self.config.retry, "get_file_contents", || {
            self.host.get_file_contents(file, head)
        })
        .await
        .map_err(host_error)?;
        let Some(remote_text) = remote_text else {
            // Listed as changed but gone at head; the delete will arrive
            // with its own commit.
            return Ok(());
        };

        let existing = self
            .store
            .get_page_by_path(config.space_id, page_path)
            .await
            .map_err(CoreError::from)?;
        let Some(page) = existing else {
            self.create_page_from_file(config, page_path, &remote_text)
                .await?;
            counts.pages_created += 1;
            return Ok(());
        };

        let local_content = self
            .store
            .get_page_content(page.id)
            .await
            .map_err(CoreError::from)?;
        let local = markdown::serialize(&local_content);
        let base = match &config.last_sync_commit {
            Some(sha) => with_retry(&self.config.retry, "get_file_contents", || {
                self.host.get_file_contents(file, sha)
            })
            .await
            .map_err(host_error)?
            .unwrap_or_default(),
            None => String::new(),
        };

        match merge::resolve(&base, &local, &remote_text) {
            MergeOutcome::Unchanged | MergeOutcome::KeepLocal => {}
            MergeOutcome::TakeRemote => {
                let content = markdown::parse(&remote_text);
                self.store
                    .update_page_content(page.id, &content, None, Some("Synced from git"), Some(head))
                    .await
                    .map_err(CoreError::from)?;
                counts.pages_updated += 1;
            }
            MergeOutcome::Conflict => {
                let remote_content = markdown::parse(&remote_text);
                self.store
                    .set_page_conflict(page.id, &local_content, &remote_content)
                    .await
                    .map_err(CoreError::from)?;
                counts.conflict_count += 1;
                tracing::warn!(page_id = page.id, path = page_path, "Pull conflict");
            }
        }
        Ok(())
    }

    /// Materialize a page for a file that has no store counterpart.
    /// The parent link is set when a page exists at the parent path;
    /// depth always derives from the path.
    async fn create_page_from_file(
        &self,
        config: &GitSyncConfig,
        page_path: &str,
        text: &str,
    ) -> Result<Page, CoreError> {
        let mut content = markdown::parse(text);
        let slug = slug_from_path(page_path).to_string();
        if content.title.is_empty() {
            content.title = title_from_slug(&slug);
        }
        let parent = match parent_path(page_path) {
            Some(parent) => self
                .store
                .get_page_by_path(config.space_id, parent)
                .await
                .map_err(CoreError::from)?
                .map(|p| p.id),
            None => None,
        };
        let position = self
            .store
            .list_children(config.space_id, parent)
            .await
            .map_err(CoreError::from)?
            .len() as i32;

        self.store
            .create_page(NewPage {
                space_id: config.space_id,
                parent_page_id: parent,
                slug,
                path: page_path.to_string(),
                depth: path_depth(page_path),
                position,
                content,
            })
            .await
            .map_err(CoreError::from)
    }

    // ── Push ─────────────────────────────────────────────────────────

    /// Store → repository. Serializes every page updated since the last
    /// successful sync (conflicted pages excluded) into one commit.
    async fn push(&self, config: &GitSyncConfig) -> Result<RunOutcome, CoreError> {
        let pages = self
            .store
            .list_pages_updated_since(config.space_id, config.last_synced_at)
            .await
            .map_err(CoreError::from)?;
        let outgoing: Vec<Page> = pages.into_iter().filter(|p| !p.has_conflict).collect();
        if outgoing.is_empty() {
            return Ok(RunOutcome::default());
        }

        let mut files = Vec::with_capacity(outgoing.len());
        for page in &outgoing {
            let content = self
                .store
                .get_page_content(page.id)
                .await
                .map_err(CoreError::from)?;
            files.push(NewFile {
                path: markdown::file_path(&config.root_path, &page.path),
                content: Some(markdown::serialize(&content)),
            });
        }

        let message = format!("Sync {} page(s) from leafpress", files.len());
        let commit = NewCommit {
            message: message.clone(),
            author: self.config.commit_author.clone(),
            files: files.clone(),
        };
        let sha = with_retry(&self.config.retry, "create_commit", || {
            self.host.create_commit(commit.clone())
        })
        .await
        .map_err(host_error)?;

        self.store
            .record_commit(NewCommitRecord {
                config_id: config.id,
                sha: sha.clone(),
                direction: SyncDirection::Push.as_str().to_string(),
                change_request_id: None,
                files_changed: files.len() as i32,
                message,
            })
            .await
            .map_err(CoreError::from)?;
        self.store
            .upsert_branch(config.id, &config.default_branch, Some(&sha), true)
            .await
            .map_err(CoreError::from)?;

        Ok(RunOutcome {
            counts: SyncCounts {
                files_processed: files.len() as i32,
                pages_updated: outgoing.len() as i32,
                ..Default::default()
            },
            new_head: Some(sha),
        })
    }

    // ── Conflict resolution ──────────────────────────────────────────

    /// Resolve a conflicted page with an explicit choice. `Merged`
    /// requires caller-supplied content. When the last conflicted page
    /// of the space is resolved, a config sitting at `conflict` moves to
    /// `success` and its synced commit advances to the conflicted run's
    /// head.
    pub async fn resolve_conflict(
        &self,
        page_id: DbId,
        choice: ResolutionChoice,
        content: Option<PageContent>,
        actor: Option<DbId>,
    ) -> Result<Page, CoreError> {
        let page = self
            .store
            .get_page(page_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "page",
                id: page_id,
            })?;
        if !page.has_conflict {
            return Err(CoreError::Validation(format!(
                "Page {page_id} is not in conflict"
            )));
        }

        let resolved_content = match choice {
            ResolutionChoice::KeepLocal => None,
            ResolutionChoice::TakeRemote => {
                let remote = page.conflict_remote.clone().ok_or_else(|| {
                    CoreError::Internal(format!("Page {page_id} has no stored remote side"))
                })?;
                Some(serde_json::from_value::<PageContent>(remote).map_err(|e| {
                    CoreError::Internal(format!("Stored remote side is invalid: {e}"))
                })?)
            }
            ResolutionChoice::Merged => Some(content.ok_or_else(|| {
                CoreError::Validation("Merged resolution requires content".into())
            })?),
        };

        if let Some(new_content) = resolved_content {
            let note = format!("Resolved sync conflict ({choice:?})");
            self.store
                .update_page_content(page_id, &new_content, actor, Some(&note), None)
                .await
                .map_err(CoreError::from)?;
        }
        self.store
            .clear_page_conflict(page_id)
            .await
            .map_err(CoreError::from)?;

        // Last conflict resolved: release the config from `conflict`.
        let remaining = self
            .store
            .count_conflicted_pages(page.space_id)
            .await
            .map_err(CoreError::from)?;
        if remaining == 0 {
            if let Some(config) = self
                .store
                .get_sync_config_for_space(page.space_id)
                .await
                .map_err(CoreError::from)?
            {
                if config.sync_status == SyncStatus::Conflict.as_str() {
                    // The conflicted run already applied the rest of its
                    // range, and the parked pages are now resolved, so the
                    // next pull resumes past that run's head instead of
                    // re-resolving the range against the stale base.
                    let resume = self
                        .store
                        .list_histories(config.id)
                        .await
                        .map_err(CoreError::from)?
                        .into_iter()
                        .find(|h| h.status == SyncRunStatus::Conflict.as_str())
                        .and_then(|h| h.end_commit);
                    self.store
                        .finish_sync(config.id, SyncStatus::Success, resume.as_deref(), None)
                        .await
                        .map_err(CoreError::from)?;
                }
            }
        }

        let mut event = DomainEvent::new("sync.conflict_resolved")
            .with_source("page", page_id)
            .with_payload(serde_json::json!({ "choice": choice }));
        if let Some(user_id) = actor {
            event = event.with_actor(user_id);
        }
        self.bus.publish(event);

        self.store
            .get_page(page_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "page",
                id: page_id,
            })
    }
}
