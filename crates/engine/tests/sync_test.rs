//! Sync engine behavior: pull, push, single-flight, conflict handling.

mod common;

use assert_matches::assert_matches;
use common::Harness;
use leafpress_core::content::{BlockNode, BlockType, PageContent};
use leafpress_core::error::CoreError;
use leafpress_core::merge::ResolutionChoice;
use leafpress_core::sync::SyncOperation;
use leafpress_db::models::NewCommitRecord;
use leafpress_engine::WebhookPayload;
use leafpress_git::GitHost;

fn paragraph_page(title: &str, text: &str) -> PageContent {
    PageContent::new(title).with_blocks(vec![BlockNode::leaf(BlockType::Paragraph, text)])
}

const INTRO_MD: &str = "---\ntitle: Intro\n---\n\nbase line\n";

#[tokio::test]
async fn pull_materializes_pages_from_repository_files() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    let head = h.host.seed_commit(
        "add docs",
        &[
            ("docs/intro.md", Some(INTRO_MD)),
            (
                "docs/guide/setup.md",
                Some("---\ntitle: Setup\n---\n\nInstall it.\n"),
            ),
            ("README.md", Some("not under the root")),
        ],
    );

    let history_id = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    let history = h.settled_history(history_id).await;

    assert_eq!(history.status, "success");
    assert_eq!(history.files_processed, 2);
    assert_eq!(history.pages_created, 2);
    assert_eq!(history.end_commit.as_deref(), Some(head.as_str()));

    let intro = h
        .store
        .get_page_by_path(space.id, "/intro")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intro.depth, 0);
    assert_eq!(intro.title, "Intro");

    let setup = h
        .store
        .get_page_by_path(space.id, "/guide/setup")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(setup.depth, 1);

    let config = h.sync_config_by_id(config.id).await;
    assert_eq!(config.sync_status, "success");
    assert_eq!(config.last_sync_commit.as_deref(), Some(head.as_str()));
    assert!(config.last_synced_at.is_some());
}

#[tokio::test]
async fn webhook_for_unknown_commits_runs_a_pull() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    let head = h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    let payload = WebhookPayload {
        commits: vec![head.clone()],
    };
    let history_id = sync
        .handle_webhook(config.id, &payload)
        .await
        .unwrap()
        .unwrap();
    let history = h.settled_history(history_id).await;

    assert_eq!(history.status, "success");
    assert_eq!(history.pages_created, 1);
    assert_eq!(h.sync_config_by_id(config.id).await.last_sync_commit, Some(head));
}

#[tokio::test]
async fn webhook_redelivery_of_recorded_commits_starts_no_run() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    let head = h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    let first = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(first).await;

    // Same notification again: every sha is in the ledger and the config
    // is caught up, so the delivery is acknowledged without a run.
    let payload = WebhookPayload {
        commits: vec![head.clone()],
    };
    assert_eq!(sync.handle_webhook(config.id, &payload).await.unwrap(), None);
    assert_eq!(h.store.list_histories(config.id).await.unwrap().len(), 1);
    assert_eq!(h.store.list_pages(space.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_sync_for_one_config_is_rejected() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    // Simulate a run holding the mutex.
    assert!(h.store.try_begin_sync(config.id).await.unwrap());
    assert_matches!(
        sync.trigger_sync(config.id, SyncOperation::Pull).await,
        Err(CoreError::Conflict(_))
    );

    // Released mutex lets the next trigger through.
    h.store
        .finish_sync(
            config.id,
            leafpress_core::sync::SyncStatus::Success,
            None,
            None,
        )
        .await
        .unwrap();
    let history_id = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    assert_eq!(h.settled_history(history_id).await.status, "success");
}

#[tokio::test]
async fn divergent_edits_park_the_page_in_conflict() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    let base = h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    let first = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(first).await;

    // Local edit...
    let page = h
        .store
        .get_page_by_path(space.id, "/intro")
        .await
        .unwrap()
        .unwrap();
    h.versions()
        .update_content(page.id, paragraph_page("Intro", "local line"), Some(1), None)
        .await
        .unwrap();

    // ...and a divergent remote edit of the same file.
    h.host.seed_commit(
        "remote edit",
        &[("docs/intro.md", Some("---\ntitle: Intro\n---\n\nremote line\n"))],
    );

    let second = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    let history = h.settled_history(second).await;
    assert_eq!(history.status, "conflict");
    assert_eq!(history.conflict_count, 1);

    let page = h.store.get_page(page.id).await.unwrap().unwrap();
    assert!(page.has_conflict);
    assert!(page.conflict_local.is_some());
    assert!(page.conflict_remote.is_some());

    // Live content stays untouched and the synced commit does not
    // advance, so resolution re-evaluates against the same base.
    let live = h.store.get_page_content(page.id).await.unwrap();
    assert_eq!(live.blocks[0].text, "local line");
    let config = h.sync_config_by_id(config.id).await;
    assert_eq!(config.sync_status, "conflict");
    assert_eq!(config.last_sync_commit.as_deref(), Some(base.as_str()));
}

#[tokio::test]
async fn resolving_the_last_conflict_releases_the_config() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    let first = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(first).await;

    let page = h
        .store
        .get_page_by_path(space.id, "/intro")
        .await
        .unwrap()
        .unwrap();
    h.versions()
        .update_content(page.id, paragraph_page("Intro", "local line"), Some(1), None)
        .await
        .unwrap();
    h.host.seed_commit(
        "remote edit",
        &[("docs/intro.md", Some("---\ntitle: Intro\n---\n\nremote line\n"))],
    );
    let second = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(second).await;
    let versions_before = h.versions().list_versions(page.id).await.unwrap().len();

    let resolved = sync
        .resolve_conflict(page.id, ResolutionChoice::KeepLocal, None, Some(1))
        .await
        .unwrap();
    assert!(!resolved.has_conflict);

    // Keeping the local side writes no new version.
    assert_eq!(
        h.versions().list_versions(page.id).await.unwrap().len(),
        versions_before
    );
    let config = h.sync_config_by_id(config.id).await;
    assert_eq!(config.sync_status, "success");
}

#[tokio::test]
async fn keep_local_resolution_is_not_reopened_by_later_commits() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    let first = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(first).await;

    let page = h
        .store
        .get_page_by_path(space.id, "/intro")
        .await
        .unwrap()
        .unwrap();
    h.versions()
        .update_content(page.id, paragraph_page("Intro", "local line"), Some(1), None)
        .await
        .unwrap();
    let conflict_head = h.host.seed_commit(
        "remote edit",
        &[("docs/intro.md", Some("---\ntitle: Intro\n---\n\nremote line\n"))],
    );
    let second = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    assert_eq!(h.settled_history(second).await.status, "conflict");

    sync.resolve_conflict(page.id, ResolutionChoice::KeepLocal, None, Some(1))
        .await
        .unwrap();

    // Resolution moves the synced commit past the conflicted run...
    let config_row = h.sync_config_by_id(config.id).await;
    assert_eq!(config_row.sync_status, "success");
    assert_eq!(
        config_row.last_sync_commit.as_deref(),
        Some(conflict_head.as_str())
    );

    // ...so a later unrelated commit pulls cleanly instead of replaying
    // the old range and re-parking the resolved page.
    let later = h.host.seed_commit(
        "add other",
        &[("docs/other.md", Some("---\ntitle: Other\n---\n\nmore\n"))],
    );
    let third = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    let history = h.settled_history(third).await;
    assert_eq!(history.status, "success");
    assert_eq!(history.conflict_count, 0);
    assert_eq!(history.pages_created, 1);

    let page = h.store.get_page(page.id).await.unwrap().unwrap();
    assert!(!page.has_conflict);
    let live = h.store.get_page_content(page.id).await.unwrap();
    assert_eq!(live.blocks[0].text, "local line");
    let config_row = h.sync_config_by_id(config.id).await;
    assert_eq!(config_row.last_sync_commit.as_deref(), Some(later.as_str()));
}

#[tokio::test]
async fn ledgered_but_unapplied_commits_are_applied_on_the_next_pull() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    // A run that recorded its commits and then died before applying
    // them: the synced commit did not advance, so the shas sit in the
    // ledger with no pages to show for them.
    let head = h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    h.store
        .record_commit(NewCommitRecord {
            config_id: config.id,
            sha: head.clone(),
            direction: "pull".to_string(),
            change_request_id: None,
            files_changed: 1,
            message: "add intro".to_string(),
        })
        .await
        .unwrap();

    let history_id = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    let history = h.settled_history(history_id).await;

    assert_eq!(history.status, "success");
    assert_eq!(history.pages_created, 1);
    assert!(h
        .store
        .get_page_by_path(space.id, "/intro")
        .await
        .unwrap()
        .is_some());
    assert_eq!(
        h.sync_config_by_id(config.id).await.last_sync_commit,
        Some(head)
    );
}

#[tokio::test]
async fn take_remote_resolution_applies_the_stored_remote_side() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    let first = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(first).await;

    let page = h
        .store
        .get_page_by_path(space.id, "/intro")
        .await
        .unwrap()
        .unwrap();
    h.versions()
        .update_content(page.id, paragraph_page("Intro", "local line"), Some(1), None)
        .await
        .unwrap();
    h.host.seed_commit(
        "remote edit",
        &[("docs/intro.md", Some("---\ntitle: Intro\n---\n\nremote line\n"))],
    );
    let second = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(second).await;

    sync.resolve_conflict(page.id, ResolutionChoice::TakeRemote, None, Some(1))
        .await
        .unwrap();
    let live = h.store.get_page_content(page.id).await.unwrap();
    assert_eq!(live.blocks[0].text, "remote line");
}

#[tokio::test]
async fn push_commits_updated_pages_and_moves_the_branch_head() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    h.tree()
        .create_page(space.id, None, paragraph_page("Intro", "hello"), None)
        .await
        .unwrap();

    let history_id = sync.trigger_sync(config.id, SyncOperation::Push).await.unwrap();
    let history = h.settled_history(history_id).await;
    assert_eq!(history.status, "success");
    assert_eq!(history.files_processed, 1);
    assert_eq!(history.pages_updated, 1);

    let head = h.host.head().unwrap();
    let text = h
        .host
        .get_file_contents("docs/intro.md", &head)
        .await
        .unwrap()
        .unwrap();
    assert!(text.contains("title: Intro"));
    assert!(text.contains("hello"));

    let branches = h.store.list_branches(config.id).await.unwrap();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].name, "main");
    assert!(branches[0].is_default);
    assert_eq!(branches[0].head_sha.as_deref(), Some(head.as_str()));

    let commits = h.store.list_commits(config.id).await.unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].direction, "push");
}

#[tokio::test]
async fn push_skips_pages_not_updated_since_the_last_sync() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    let first = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(first).await;

    // Nothing touched since the pull stamped last_synced_at.
    let quiet = sync.trigger_sync(config.id, SyncOperation::Push).await.unwrap();
    assert_eq!(h.settled_history(quiet).await.files_processed, 0);

    let page = h
        .store
        .get_page_by_path(space.id, "/intro")
        .await
        .unwrap()
        .unwrap();
    h.versions()
        .update_content(page.id, paragraph_page("Intro", "edited"), Some(1), None)
        .await
        .unwrap();

    let push = sync.trigger_sync(config.id, SyncOperation::Push).await.unwrap();
    let history = h.settled_history(push).await;
    assert_eq!(history.files_processed, 1);
    assert_eq!(history.pages_updated, 1);
}

#[tokio::test]
async fn transient_host_failures_are_retried_to_success() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    h.host.inject_transient_failures(2);

    let history_id = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    let history = h.settled_history(history_id).await;
    assert_eq!(history.status, "success");
    assert_eq!(history.pages_created, 1);
}

#[tokio::test]
async fn remote_file_deletion_soft_deletes_the_page() {
    let h = Harness::new();
    let space = h.space("docs").await;
    let config = h.sync_config(space.id, "docs").await;
    let sync = h.sync();

    h.host.seed_commit("add intro", &[("docs/intro.md", Some(INTRO_MD))]);
    let first = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    h.settled_history(first).await;

    h.host.seed_commit("remove intro", &[("docs/intro.md", None)]);
    let second = sync.trigger_sync(config.id, SyncOperation::Pull).await.unwrap();
    let history = h.settled_history(second).await;

    assert_eq!(history.status, "success");
    assert_eq!(history.pages_deleted, 1);
    assert!(h
        .store
        .get_page_by_path(space.id, "/intro")
        .await
        .unwrap()
        .is_none());
}
