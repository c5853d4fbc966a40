//! Shared harness for engine integration tests: an in-memory store and
//! git host wired into the services with fast timeouts.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use leafpress_core::types::DbId;
use leafpress_db::models::{GitSyncConfig, NewSpace, NewSyncConfig, Space, SyncHistory};
use leafpress_db::store::{MemoryStore, Store};
use leafpress_engine::{
    ChangeRequestService, EngineConfig, SyncEngine, TreeService, VersionService,
};
use leafpress_events::EventBus;
use leafpress_git::{MemoryGitHost, RetryPolicy};

/// Honors `RUST_LOG`; repeated init attempts across tests are harmless.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub store: Arc<dyn Store>,
    pub host: Arc<MemoryGitHost>,
    pub bus: Arc<EventBus>,
    pub config: EngineConfig,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            store: Arc::new(MemoryStore::new()),
            host: Arc::new(MemoryGitHost::new()),
            bus: Arc::new(EventBus::default()),
            config: EngineConfig {
                watchdog_timeout: Duration::from_millis(50),
                watchdog_interval: Duration::from_millis(10),
                retry: RetryPolicy {
                    max_attempts: 3,
                    base_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(4),
                },
                commit_author: "leafpress-tests".to_string(),
            },
        }
    }

    pub fn tree(&self) -> TreeService {
        TreeService::new(self.store.clone(), self.bus.clone())
    }

    pub fn versions(&self) -> VersionService {
        VersionService::new(self.store.clone(), self.bus.clone())
    }

    pub fn sync(&self) -> SyncEngine {
        SyncEngine::new(
            self.store.clone(),
            self.host.clone(),
            self.bus.clone(),
            self.config.clone(),
        )
    }

    pub fn change_requests(&self) -> ChangeRequestService {
        ChangeRequestService::new(
            self.store.clone(),
            self.host.clone(),
            self.bus.clone(),
            &self.config,
        )
    }

    pub async fn space(&self, slug: &str) -> Space {
        self.space_with_policy(slug, None).await
    }

    pub async fn space_with_policy(&self, slug: &str, required_approvals: Option<i32>) -> Space {
        self.store
            .create_space(NewSpace {
                name: slug.to_string(),
                slug: slug.to_string(),
                required_approvals,
            })
            .await
            .expect("create space")
    }

    pub async fn sync_config(&self, space_id: DbId, root: &str) -> GitSyncConfig {
        self.store
            .create_sync_config(NewSyncConfig {
                space_id,
                repository: "acme/docs".to_string(),
                default_branch: "main".to_string(),
                root_path: root.to_string(),
                include_patterns: Vec::new(),
                exclude_patterns: Vec::new(),
            })
            .await
            .expect("create sync config")
    }

    /// Poll until the spawned sync run settles its history row.
    pub async fn settled_history(&self, history_id: DbId) -> SyncHistory {
        for _ in 0..400 {
            let history = self
                .store
                .get_sync_history(history_id)
                .await
                .expect("get history")
                .expect("history exists");
            if history.status != "running" {
                return history;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("sync run {history_id} never settled");
    }

    pub async fn sync_config_by_id(&self, id: DbId) -> GitSyncConfig {
        self.store
            .get_sync_config(id)
            .await
            .expect("get config")
            .expect("config exists")
    }
}
