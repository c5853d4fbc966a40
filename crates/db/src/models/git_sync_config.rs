//! Git sync config models: the 1:1 binding between a space and an
//! external repository.

use leafpress_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A sync config row from the `git_sync_configs` table.
///
/// `sync_status` doubles as the single-flight mutex: it is `syncing`
/// exactly while a sync run owns the binding.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GitSyncConfig {
    pub id: DbId,
    pub space_id: DbId,
    /// Opaque repository reference understood by the git host.
    pub repository: String,
    pub default_branch: String,
    /// Repository directory the page tree maps under (may be empty).
    pub root_path: String,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub sync_status: String,
    pub last_sync_commit: Option<String>,
    pub last_synced_at: Option<Timestamp>,
    /// Set while `sync_status = 'syncing'`; the watchdog uses it to
    /// detect stuck runs.
    pub sync_started_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for binding a space to a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSyncConfig {
    pub space_id: DbId,
    pub repository: String,
    pub default_branch: String,
    pub root_path: String,
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}
