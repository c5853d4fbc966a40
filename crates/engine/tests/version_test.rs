//! Version log behavior: snapshots hold pre-update content and restore
//! is history-preserving and idempotent.

mod common;

use assert_matches::assert_matches;
use common::Harness;
use leafpress_core::content::{BlockNode, BlockType, PageContent};
use leafpress_core::error::CoreError;

fn paragraph_page(title: &str, text: &str) -> PageContent {
    PageContent::new(title).with_blocks(vec![BlockNode::leaf(BlockType::Paragraph, text)])
}

fn first_paragraph(content: &PageContent) -> &str {
    &content.blocks[0].text
}

#[tokio::test]
async fn three_updates_produce_versions_one_two_three() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let page = h
        .tree()
        .create_page(space.id, None, paragraph_page("Intro", "original"), None)
        .await
        .unwrap();
    let versions = h.versions();

    for text in ["first", "second", "third"] {
        versions
            .update_content(page.id, paragraph_page("Intro", text), Some(1), None)
            .await
            .unwrap();
    }

    let log = versions.list_versions(page.id).await.unwrap();
    let numbers: Vec<_> = log.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![3, 2, 1]);

    // Each snapshot holds the content as it was before its update.
    let v1: PageContent = serde_json::from_value(log[2].content.clone()).unwrap();
    assert_eq!(first_paragraph(&v1), "original");
    let v3: PageContent = serde_json::from_value(log[0].content.clone()).unwrap();
    assert_eq!(first_paragraph(&v3), "second");

    let live = h.store.get_page_content(page.id).await.unwrap();
    assert_eq!(first_paragraph(&live), "third");
}

#[tokio::test]
async fn page_creation_writes_no_version_row() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let page = h
        .tree()
        .create_page(space.id, None, paragraph_page("Intro", "original"), None)
        .await
        .unwrap();

    assert!(h.versions().list_versions(page.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn restore_snapshots_current_content_first() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let page = h
        .tree()
        .create_page(space.id, None, paragraph_page("Intro", "original"), None)
        .await
        .unwrap();
    let versions = h.versions();

    versions
        .update_content(page.id, paragraph_page("Intro", "edited"), Some(1), None)
        .await
        .unwrap();

    // Version 1 holds "original"; restoring brings it back live while
    // snapshotting "edited" as version 2.
    let restored = versions.restore_version(page.id, 1, Some(1)).await.unwrap();
    assert_eq!(restored.map(|v| v.version_number), Some(2));

    let live = h.store.get_page_content(page.id).await.unwrap();
    assert_eq!(first_paragraph(&live), "original");
    let log = versions.list_versions(page.id).await.unwrap();
    assert_eq!(log.len(), 2);
    let v2: PageContent = serde_json::from_value(log[0].content.clone()).unwrap();
    assert_eq!(first_paragraph(&v2), "edited");
}

#[tokio::test]
async fn double_restore_is_idempotent() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let page = h
        .tree()
        .create_page(space.id, None, paragraph_page("Intro", "original"), None)
        .await
        .unwrap();
    let versions = h.versions();

    versions
        .update_content(page.id, paragraph_page("Intro", "edited"), Some(1), None)
        .await
        .unwrap();

    assert!(versions
        .restore_version(page.id, 1, Some(1))
        .await
        .unwrap()
        .is_some());
    // Live content already matches version 1; nothing to do.
    assert!(versions
        .restore_version(page.id, 1, Some(1))
        .await
        .unwrap()
        .is_none());
    assert_eq!(versions.list_versions(page.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_version_is_not_found() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let page = h
        .tree()
        .create_page(space.id, None, paragraph_page("Intro", "original"), None)
        .await
        .unwrap();

    assert_matches!(
        h.versions().get_version(page.id, 9).await,
        Err(CoreError::NotFound { .. })
    );
    assert_matches!(
        h.versions().restore_version(page.id, 9, None).await,
        Err(CoreError::NotFound { .. })
    );
}
