//! The abstract repository collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GitHostError;

// ---------------------------------------------------------------------------
// Commit and file types
// ---------------------------------------------------------------------------

/// How a file changed within a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub kind: FileChangeKind,
}

/// A commit as reported by the host, oldest-first in fetch results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<FileChange>,
}

/// One file in a commit request; `content = None` deletes the file.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub path: String,
    pub content: Option<String>,
}

/// A commit request sent to the host.
#[derive(Debug, Clone)]
pub struct NewCommit {
    pub message: String,
    pub author: String,
    pub files: Vec<NewFile>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The repository collaborator consumed by the sync engine.
///
/// Implementations are expected to be cheap to share behind an `Arc` and
/// safe to call concurrently.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Commits after `since` (exclusive), oldest first. `None` returns the
    /// full history.
    async fn fetch_commits(&self, since: Option<&str>) -> Result<Vec<CommitInfo>, GitHostError>;

    /// Contents of `path` at `git_ref`, or `None` when the file does not
    /// exist at that ref. An unknown ref is [`GitHostError::NotFound`].
    async fn get_file_contents(
        &self,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<String>, GitHostError>;

    /// Create a commit on the default branch; returns its sha.
    async fn create_commit(&self, commit: NewCommit) -> Result<String, GitHostError>;

    /// Register a webhook endpoint with the host.
    async fn register_webhook(&self, url: &str, secret: &str) -> Result<(), GitHostError>;
}
