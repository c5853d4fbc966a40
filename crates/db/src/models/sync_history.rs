//! Sync history models: the append-only audit log of sync runs.

use leafpress_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A sync run row from the `sync_history` table.
///
/// Created with status `running` when the run is triggered and completed
/// exactly once with a terminal status; completed rows are never mutated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SyncHistory {
    pub id: DbId,
    pub config_id: DbId,
    /// `"pull"`, `"push"`, or `"webhook"`.
    pub operation: String,
    /// `"running"`, `"success"`, `"conflict"`, or `"error"`.
    pub status: String,
    pub start_commit: Option<String>,
    pub end_commit: Option<String>,
    pub files_processed: i32,
    pub pages_created: i32,
    pub pages_updated: i32,
    pub pages_deleted: i32,
    pub conflict_count: i32,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for opening a sync run.
#[derive(Debug, Clone)]
pub struct NewSyncHistory {
    pub config_id: DbId,
    pub operation: String,
    pub start_commit: Option<String>,
}

/// Counters accumulated over a sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncCounts {
    pub files_processed: i32,
    pub pages_created: i32,
    pub pages_updated: i32,
    pub pages_deleted: i32,
    pub conflict_count: i32,
}
