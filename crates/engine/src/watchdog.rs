//! Sync watchdog: the only cancellation mechanism for sync runs.
//!
//! Sync tasks are never killed; a run that stops making progress leaves
//! its config stuck in `syncing` with the mutex held. The watchdog
//! sweeps on an interval, marks configs stuck longer than the timeout as
//! `error` (releasing the mutex), and completes their dangling `running`
//! history rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leafpress_core::error::CoreError;
use leafpress_core::sync::{SyncRunStatus, SyncStatus};
use leafpress_db::models::SyncCounts;
use leafpress_db::store::Store;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;

const STUCK_ERROR: &str = "Sync exceeded the watchdog timeout";

/// Run the watchdog loop until `cancel` is triggered.
pub async fn run(store: Arc<dyn Store>, config: EngineConfig, cancel: CancellationToken) {
    tracing::info!(
        timeout_secs = config.watchdog_timeout.as_secs(),
        interval_secs = config.watchdog_interval.as_secs(),
        "Sync watchdog started"
    );

    let mut interval = tokio::time::interval(config.watchdog_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Sync watchdog stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(store.as_ref(), config.watchdog_timeout).await {
                    Ok(swept) if swept > 0 => {
                        tracing::warn!(swept, "Watchdog released stuck syncs");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Watchdog sweep failed");
                    }
                }
            }
        }
    }
}

/// One sweep pass: release every config stuck in `syncing` longer than
/// `timeout`. Returns the number of configs released.
pub async fn sweep(store: &dyn Store, timeout: Duration) -> Result<usize, CoreError> {
    let stuck_before = Utc::now()
        - chrono::Duration::from_std(timeout)
            .map_err(|e| CoreError::Internal(format!("invalid watchdog timeout: {e}")))?;
    let stuck = store
        .list_stuck_syncs(stuck_before)
        .await
        .map_err(CoreError::from)?;

    for config in &stuck {
        tracing::warn!(
            config_id = config.id,
            started_at = ?config.sync_started_at,
            "Releasing stuck sync"
        );
        store
            .finish_sync(config.id, SyncStatus::Error, None, Some(STUCK_ERROR))
            .await
            .map_err(CoreError::from)?;
        let dangling = store
            .find_running_histories(config.id)
            .await
            .map_err(CoreError::from)?;
        for history in dangling {
            store
                .complete_sync_history(
                    history.id,
                    SyncRunStatus::Error,
                    None,
                    SyncCounts::default(),
                    Some(STUCK_ERROR),
                )
                .await
                .map_err(CoreError::from)?;
        }
    }
    Ok(stuck.len())
}
