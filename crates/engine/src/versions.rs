//! Version service: the immutable per-page snapshot log.

use std::sync::Arc;

use leafpress_core::content::PageContent;
use leafpress_core::error::CoreError;
use leafpress_core::markdown;
use leafpress_core::slug::validate_title;
use leafpress_core::types::DbId;
use leafpress_db::models::PageVersion;
use leafpress_db::store::Store;
use leafpress_events::{DomainEvent, EventBus};

/// Orchestrates content updates and version history.
pub struct VersionService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl VersionService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Apply new content to a page. The content as it was before the
    /// update is snapshotted as the next version in the same atomic
    /// store operation, so a page updated three times carries versions
    /// 1, 2, 3.
    pub async fn update_content(
        &self,
        page_id: DbId,
        content: PageContent,
        author: Option<DbId>,
        note: Option<&str>,
    ) -> Result<PageVersion, CoreError> {
        validate_title(&content.title)?;
        let version = self
            .store
            .update_page_content(page_id, &content, author, note, None)
            .await
            .map_err(CoreError::from)?;

        tracing::debug!(page_id, version = version.version_number, "Page content updated");
        let mut event = DomainEvent::new("page.updated")
            .with_source("page", page_id)
            .with_payload(serde_json::json!({ "version": version.version_number }));
        if let Some(user_id) = author {
            event = event.with_actor(user_id);
        }
        self.bus.publish(event);
        Ok(version)
    }

    /// Restore a page to the content held by `version_number`.
    ///
    /// The current content is snapshotted first, so restoring never
    /// destroys history. Restoring to content identical to the live page
    /// is a no-op and creates no version, which makes a double restore
    /// idempotent.
    pub async fn restore_version(
        &self,
        page_id: DbId,
        version_number: i32,
        actor: Option<DbId>,
    ) -> Result<Option<PageVersion>, CoreError> {
        let version = self
            .store
            .get_version(page_id, version_number)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "page version",
                id: version_number as DbId,
            })?;
        let target: PageContent = serde_json::from_value(version.content).map_err(|e| {
            CoreError::Internal(format!(
                "Version {version_number} of page {page_id} holds invalid content: {e}"
            ))
        })?;

        let current = self
            .store
            .get_page_content(page_id)
            .await
            .map_err(CoreError::from)?;
        if markdown::serialize(&current) == markdown::serialize(&target) {
            return Ok(None);
        }

        let note = format!("Restored from version {version_number}");
        let snapshot = self
            .store
            .update_page_content(page_id, &target, actor, Some(&note), None)
            .await
            .map_err(CoreError::from)?;

        tracing::info!(page_id, version_number, "Page restored");
        let mut event = DomainEvent::new("version.restored")
            .with_source("page", page_id)
            .with_payload(serde_json::json!({ "restored_from": version_number }));
        if let Some(user_id) = actor {
            event = event.with_actor(user_id);
        }
        self.bus.publish(event);
        Ok(Some(snapshot))
    }

    /// Versions of a page, newest first.
    pub async fn list_versions(&self, page_id: DbId) -> Result<Vec<PageVersion>, CoreError> {
        self.store
            .list_versions(page_id)
            .await
            .map_err(CoreError::from)
    }

    /// One version of a page by number.
    pub async fn get_version(
        &self,
        page_id: DbId,
        version_number: i32,
    ) -> Result<PageVersion, CoreError> {
        self.store
            .get_version(page_id, version_number)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "page version",
                id: version_number as DbId,
            })
    }
}
