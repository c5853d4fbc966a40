//! Page tree behavior: paths, depths, moves, ordering, deletion.

mod common;

use assert_matches::assert_matches;
use common::Harness;
use leafpress_core::content::PageContent;
use leafpress_core::error::CoreError;

#[tokio::test]
async fn nested_pages_derive_path_and_depth_from_parent() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let tree = h.tree();

    let guide = tree
        .create_page(space.id, None, PageContent::new("Guide"), None)
        .await
        .unwrap();
    assert_eq!(guide.path, "/guide");
    assert_eq!(guide.depth, 0);
    assert_eq!(guide.position, 0);

    let setup = tree
        .create_page(space.id, Some(guide.id), PageContent::new("Setup"), None)
        .await
        .unwrap();
    assert_eq!(setup.path, "/guide/setup");
    assert_eq!(setup.depth, 1);
    assert_eq!(setup.parent_page_id, Some(guide.id));
}

#[tokio::test]
async fn duplicate_title_under_same_parent_is_a_conflict() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let tree = h.tree();

    tree.create_page(space.id, None, PageContent::new("Intro"), None)
        .await
        .unwrap();
    let result = tree
        .create_page(space.id, None, PageContent::new("Intro"), None)
        .await;
    assert_matches!(result, Err(CoreError::Conflict(_)));
}

#[tokio::test]
async fn moving_a_page_under_its_own_descendant_is_rejected() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let tree = h.tree();

    let a = tree
        .create_page(space.id, None, PageContent::new("A"), None)
        .await
        .unwrap();
    let b = tree
        .create_page(space.id, Some(a.id), PageContent::new("B"), None)
        .await
        .unwrap();

    assert_matches!(
        tree.move_page(a.id, Some(b.id), 0, None).await,
        Err(CoreError::Conflict(_))
    );
    assert_matches!(
        tree.move_page(a.id, Some(a.id), 0, None).await,
        Err(CoreError::Conflict(_))
    );
}

#[tokio::test]
async fn moving_a_subtree_rewrites_descendant_paths_and_depths() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let tree = h.tree();

    let a = tree
        .create_page(space.id, None, PageContent::new("A"), None)
        .await
        .unwrap();
    let b = tree
        .create_page(space.id, Some(a.id), PageContent::new("B"), None)
        .await
        .unwrap();
    let c = tree
        .create_page(space.id, None, PageContent::new("C"), None)
        .await
        .unwrap();

    let moved = tree.move_page(a.id, Some(c.id), 0, None).await.unwrap();
    assert_eq!(moved.path, "/c/a");
    assert_eq!(moved.depth, 1);

    let b = h.store.get_page(b.id).await.unwrap().unwrap();
    assert_eq!(b.path, "/c/a/b");
    assert_eq!(b.depth, 2);
}

#[tokio::test]
async fn reorder_renumbers_siblings_sequentially() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let tree = h.tree();

    let p0 = tree
        .create_page(space.id, None, PageContent::new("First"), None)
        .await
        .unwrap();
    let p1 = tree
        .create_page(space.id, None, PageContent::new("Second"), None)
        .await
        .unwrap();
    let p2 = tree
        .create_page(space.id, None, PageContent::new("Third"), None)
        .await
        .unwrap();

    tree.reorder_page(p2.id, 0).await.unwrap();

    let roots = tree.subtree(space.id, None, None).await.unwrap();
    let ids: Vec<_> = roots.iter().map(|n| n.page.id).collect();
    assert_eq!(ids, vec![p2.id, p0.id, p1.id]);
    let positions: Vec<_> = roots.iter().map(|n| n.page.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[tokio::test]
async fn delete_removes_the_whole_subtree() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let tree = h.tree();

    let a = tree
        .create_page(space.id, None, PageContent::new("A"), None)
        .await
        .unwrap();
    let b = tree
        .create_page(space.id, Some(a.id), PageContent::new("B"), None)
        .await
        .unwrap();
    tree.create_page(space.id, None, PageContent::new("Other"), None)
        .await
        .unwrap();

    let deleted = tree.delete_page(a.id, None).await.unwrap();
    assert_eq!(deleted, 2);
    assert!(h.store.get_page(a.id).await.unwrap().is_none());
    assert!(h.store.get_page(b.id).await.unwrap().is_none());
    assert_eq!(h.store.list_pages(space.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn breadcrumb_walks_from_root_to_page() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let tree = h.tree();

    let guide = tree
        .create_page(space.id, None, PageContent::new("Guide"), None)
        .await
        .unwrap();
    let setup = tree
        .create_page(space.id, Some(guide.id), PageContent::new("Setup"), None)
        .await
        .unwrap();

    let chain = tree.breadcrumb(setup.id).await.unwrap();
    let paths: Vec<_> = chain.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["/guide", "/guide/setup"]);
}

#[tokio::test]
async fn subtree_respects_max_depth() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let tree = h.tree();

    let a = tree
        .create_page(space.id, None, PageContent::new("A"), None)
        .await
        .unwrap();
    let b = tree
        .create_page(space.id, Some(a.id), PageContent::new("B"), None)
        .await
        .unwrap();
    tree.create_page(space.id, Some(b.id), PageContent::new("C"), None)
        .await
        .unwrap();

    let truncated = tree.subtree(space.id, None, Some(1)).await.unwrap();
    assert_eq!(truncated.len(), 1);
    assert_eq!(truncated[0].children.len(), 1);
    assert!(truncated[0].children[0].children.is_empty());
}
