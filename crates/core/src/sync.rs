//! Sync state machine and run bookkeeping enums.
//!
//! Each git sync config carries a `sync_status` that doubles as the
//! single-flight mutex: `idle → syncing → {success, conflict, error}`.
//! Entering `syncing` is the mutex acquisition; any terminal status (or
//! `idle`) permits a new sync, `syncing` rejects it with Conflict.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Config status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Success,
    Conflict,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Success => "success",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "idle" => Ok(SyncStatus::Idle),
            "syncing" => Ok(SyncStatus::Syncing),
            "success" => Ok(SyncStatus::Success),
            "conflict" => Ok(SyncStatus::Conflict),
            "error" => Ok(SyncStatus::Error),
            other => Err(CoreError::Internal(format!(
                "Unknown sync status '{other}'"
            ))),
        }
    }

    /// Whether a new sync may begin from this status.
    pub fn can_begin_sync(&self) -> bool {
        !matches!(self, SyncStatus::Syncing)
    }
}

// ---------------------------------------------------------------------------
// Direction and operation
// ---------------------------------------------------------------------------

/// Direction of a sync relative to the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Repository → store.
    Pull,
    /// Store → repository.
    Push,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Pull => "pull",
            SyncDirection::Push => "push",
        }
    }
}

/// What triggered a sync run, recorded on its history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Pull,
    Push,
    Webhook,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Pull => "pull",
            SyncOperation::Push => "push",
            SyncOperation::Webhook => "webhook",
        }
    }

    pub fn direction(&self) -> SyncDirection {
        match self {
            SyncOperation::Push => SyncDirection::Push,
            SyncOperation::Pull | SyncOperation::Webhook => SyncDirection::Pull,
        }
    }
}

/// Terminal (or running) status of a single sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRunStatus {
    Running,
    Success,
    Conflict,
    Error,
}

impl SyncRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRunStatus::Running => "running",
            SyncRunStatus::Success => "success",
            SyncRunStatus::Conflict => "conflict",
            SyncRunStatus::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_syncing_blocks_a_new_sync() {
        assert!(SyncStatus::Idle.can_begin_sync());
        assert!(SyncStatus::Success.can_begin_sync());
        assert!(SyncStatus::Conflict.can_begin_sync());
        assert!(SyncStatus::Error.can_begin_sync());
        assert!(!SyncStatus::Syncing.can_begin_sync());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            SyncStatus::Idle,
            SyncStatus::Syncing,
            SyncStatus::Success,
            SyncStatus::Conflict,
            SyncStatus::Error,
        ] {
            assert_eq!(SyncStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn webhook_operation_pulls() {
        assert_eq!(SyncOperation::Webhook.direction(), SyncDirection::Pull);
        assert_eq!(SyncOperation::Push.direction(), SyncDirection::Push);
    }
}
