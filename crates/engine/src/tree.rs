//! Content tree service: page creation, moves, ordering, and traversal.

use std::sync::Arc;

use leafpress_core::content::PageContent;
use leafpress_core::error::CoreError;
use leafpress_core::slug::{generate_slug, join_path, path_depth, validate_slug, validate_title};
use leafpress_core::types::DbId;
use leafpress_db::models::{NewPage, Page, PageRelocation};
use leafpress_db::store::Store;
use leafpress_events::{DomainEvent, EventBus};
use serde::Serialize;

/// Ancestor-walk bound; a parent chain longer than this indicates a
/// corrupted tree.
const MAX_ANCESTOR_HOPS: usize = 128;

/// A page with its (position-ordered) children, as returned by
/// [`TreeService::subtree`].
#[derive(Debug, Clone, Serialize)]
pub struct PageTreeNode {
    pub page: Page,
    pub children: Vec<PageTreeNode>,
}

/// Orchestrates the page tree of a space.
pub struct TreeService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl TreeService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Create a page under `parent` (root level for `None`) with its
    /// initial content. The slug and path derive from the content title;
    /// a duplicate path within the space is a [`CoreError::Conflict`].
    pub async fn create_page(
        &self,
        space_id: DbId,
        parent: Option<DbId>,
        content: PageContent,
        actor: Option<DbId>,
    ) -> Result<Page, CoreError> {
        validate_title(&content.title)?;
        self.store
            .get_space(space_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "space",
                id: space_id,
            })?;

        let parent_page = match parent {
            Some(parent_id) => Some(self.require_page_in_space(parent_id, space_id).await?),
            None => None,
        };

        let slug = generate_slug(&content.title);
        validate_slug(&slug)?;
        let path = join_path(parent_page.as_ref().map(|p| p.path.as_str()), &slug);
        let depth = parent_page.as_ref().map(|p| p.depth + 1).unwrap_or(0);
        let position = self
            .store
            .list_children(space_id, parent)
            .await
            .map_err(CoreError::from)?
            .len() as i32;

        let page = self
            .store
            .create_page(NewPage {
                space_id,
                parent_page_id: parent,
                slug,
                path: path.clone(),
                depth,
                position,
                content,
            })
            .await
            .map_err(CoreError::from)?;

        tracing::info!(page_id = page.id, space_id, path = %page.path, "Page created");
        let mut event = DomainEvent::new("page.created")
            .with_source("page", page.id)
            .with_payload(serde_json::json!({ "path": page.path }));
        if let Some(user_id) = actor {
            event = event.with_actor(user_id);
        }
        self.bus.publish(event);
        Ok(page)
    }

    /// Move a page (and its whole subtree) under a new parent at the
    /// given sibling position.
    ///
    /// Rejected with [`CoreError::Conflict`] when the target parent is
    /// the page itself or one of its descendants, or when the new path is
    /// already taken. Paths and depths of every descendant are recomputed
    /// in one batch.
    pub async fn move_page(
        &self,
        page_id: DbId,
        new_parent: Option<DbId>,
        position: i32,
        actor: Option<DbId>,
    ) -> Result<Page, CoreError> {
        let page = self.require_page(page_id).await?;

        if new_parent == Some(page_id) {
            return Err(CoreError::Conflict(
                "A page cannot become its own parent".into(),
            ));
        }
        let parent_page = match new_parent {
            Some(parent_id) => {
                let parent = self.require_page_in_space(parent_id, page.space_id).await?;
                self.ensure_not_descendant(&page, &parent).await?;
                Some(parent)
            }
            None => None,
        };

        let new_path = join_path(parent_page.as_ref().map(|p| p.path.as_str()), &page.slug);
        if new_path != page.path {
            let taken = self
                .store
                .get_page_by_path(page.space_id, &new_path)
                .await
                .map_err(CoreError::from)?;
            if taken.is_some() {
                return Err(CoreError::Conflict(format!(
                    "A page already exists at {new_path}"
                )));
            }
        }

        // Relocate the page and every descendant in one transaction.
        let subtree_prefix = format!("{}/", page.path);
        let mut relocations = vec![PageRelocation {
            page_id,
            parent_page_id: new_parent,
            path: new_path.clone(),
            depth: path_depth(&new_path),
            position,
        }];
        let all = self
            .store
            .list_pages(page.space_id)
            .await
            .map_err(CoreError::from)?;
        for descendant in all.iter().filter(|p| p.path.starts_with(&subtree_prefix)) {
            let descendant_path = format!("{new_path}{}", &descendant.path[page.path.len()..]);
            relocations.push(PageRelocation {
                page_id: descendant.id,
                parent_page_id: descendant.parent_page_id,
                depth: path_depth(&descendant_path),
                path: descendant_path,
                position: descendant.position,
            });
        }
        self.store
            .relocate_pages(&relocations)
            .await
            .map_err(CoreError::from)?;

        self.normalize_positions(page.space_id, new_parent, page_id, position)
            .await?;

        tracing::info!(page_id, from = %page.path, to = %new_path, "Page moved");
        let mut event = DomainEvent::new("page.moved")
            .with_source("page", page_id)
            .with_payload(serde_json::json!({ "from": page.path, "to": new_path }));
        if let Some(user_id) = actor {
            event = event.with_actor(user_id);
        }
        self.bus.publish(event);

        self.require_page(page_id).await
    }

    /// Renumber a page within its current sibling group.
    pub async fn reorder_page(&self, page_id: DbId, position: i32) -> Result<Page, CoreError> {
        let page = self.require_page(page_id).await?;
        self.normalize_positions(page.space_id, page.parent_page_id, page_id, position)
            .await?;
        self.require_page(page_id).await
    }

    /// Soft-delete a page and its whole subtree. Returns the number of
    /// pages removed.
    pub async fn delete_page(&self, page_id: DbId, actor: Option<DbId>) -> Result<usize, CoreError> {
        let page = self.require_page(page_id).await?;
        let subtree_prefix = format!("{}/", page.path);
        let all = self
            .store
            .list_pages(page.space_id)
            .await
            .map_err(CoreError::from)?;

        let mut deleted = 0;
        for target in all
            .iter()
            .filter(|p| p.id == page_id || p.path.starts_with(&subtree_prefix))
        {
            if self
                .store
                .soft_delete_page(target.id)
                .await
                .map_err(CoreError::from)?
            {
                deleted += 1;
            }
        }

        tracing::info!(page_id, path = %page.path, deleted, "Page deleted");
        let mut event = DomainEvent::new("page.deleted")
            .with_source("page", page_id)
            .with_payload(serde_json::json!({ "path": page.path, "deleted": deleted }));
        if let Some(user_id) = actor {
            event = event.with_actor(user_id);
        }
        self.bus.publish(event);
        Ok(deleted)
    }

    /// The tree under `root` (the whole space for `None`), children
    /// ordered by position, optionally truncated `max_depth` levels below
    /// the starting point.
    pub async fn subtree(
        &self,
        space_id: DbId,
        root: Option<DbId>,
        max_depth: Option<u32>,
    ) -> Result<Vec<PageTreeNode>, CoreError> {
        if let Some(root_id) = root {
            self.require_page_in_space(root_id, space_id).await?;
        }
        let all = self
            .store
            .list_pages(space_id)
            .await
            .map_err(CoreError::from)?;
        Ok(build_forest(&all, root, max_depth))
    }

    /// The chain of pages from the root of the space down to `page_id`,
    /// inclusive.
    pub async fn breadcrumb(&self, page_id: DbId) -> Result<Vec<Page>, CoreError> {
        let mut chain = vec![self.require_page(page_id).await?];
        for _ in 0..MAX_ANCESTOR_HOPS {
            let Some(parent_id) = chain.last().and_then(|p| p.parent_page_id) else {
                chain.reverse();
                return Ok(chain);
            };
            chain.push(self.require_page(parent_id).await?);
        }
        Err(CoreError::Internal(format!(
            "Parent chain of page {page_id} exceeds {MAX_ANCESTOR_HOPS} links"
        )))
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn require_page(&self, page_id: DbId) -> Result<Page, CoreError> {
        self.store
            .get_page(page_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::NotFound {
                entity: "page",
                id: page_id,
            })
    }

    async fn require_page_in_space(
        &self,
        page_id: DbId,
        space_id: DbId,
    ) -> Result<Page, CoreError> {
        let page = self.require_page(page_id).await?;
        if page.space_id != space_id {
            return Err(CoreError::Validation(format!(
                "Page {page_id} belongs to a different space"
            )));
        }
        Ok(page)
    }

    /// Walk up from `candidate_parent`; finding `page` on the way means
    /// the move would create a cycle.
    async fn ensure_not_descendant(
        &self,
        page: &Page,
        candidate_parent: &Page,
    ) -> Result<(), CoreError> {
        let mut current = candidate_parent.clone();
        for _ in 0..MAX_ANCESTOR_HOPS {
            if current.id == page.id {
                return Err(CoreError::Conflict(format!(
                    "Cannot move page {} under its own descendant {}",
                    page.id, candidate_parent.id
                )));
            }
            match current.parent_page_id {
                Some(parent_id) => current = self.require_page(parent_id).await?,
                None => return Ok(()),
            }
        }
        Err(CoreError::Internal(format!(
            "Parent chain of page {} exceeds {MAX_ANCESTOR_HOPS} links",
            candidate_parent.id
        )))
    }

    /// Re-number a sibling group 0..n with `page_id` placed at
    /// `position` (clamped).
    async fn normalize_positions(
        &self,
        space_id: DbId,
        parent: Option<DbId>,
        page_id: DbId,
        position: i32,
    ) -> Result<(), CoreError> {
        let siblings = self
            .store
            .list_children(space_id, parent)
            .await
            .map_err(CoreError::from)?;
        let mut ordered: Vec<DbId> = siblings
            .iter()
            .map(|p| p.id)
            .filter(|id| *id != page_id)
            .collect();
        let index = (position.max(0) as usize).min(ordered.len());
        ordered.insert(index, page_id);

        let orderings: Vec<(DbId, i32)> = ordered
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i as i32))
            .collect();
        self.store
            .reorder_pages(&orderings)
            .await
            .map_err(CoreError::from)
    }
}

/// Assemble position-ordered trees out of a flat page list.
fn build_forest(pages: &[Page], root: Option<DbId>, max_depth: Option<u32>) -> Vec<PageTreeNode> {
    let mut children: Vec<&Page> = pages
        .iter()
        .filter(|p| p.parent_page_id == root)
        .collect();
    children.sort_by_key(|p| p.position);

    children
        .into_iter()
        .map(|page| PageTreeNode {
            page: page.clone(),
            children: match max_depth {
                Some(0) => Vec::new(),
                _ => build_forest(pages, Some(page.id), max_depth.map(|d| d - 1)),
            },
        })
        .collect()
}
