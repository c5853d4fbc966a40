//! In-memory [`GitHost`] implementation.
//!
//! Keeps the full file snapshot at every commit so `get_file_contents`
//! can answer for any historical ref — which is exactly what the sync
//! engine's three-way base lookup needs. Also supports failure injection
//! so retry and abort paths can be exercised in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::GitHostError;
use crate::host::{CommitInfo, FileChange, FileChangeKind, GitHost, NewCommit, NewFile};

struct StoredCommit {
    info: CommitInfo,
    /// Full file tree as of this commit.
    snapshot: HashMap<String, String>,
}

#[derive(Default)]
struct HostState {
    commits: Vec<StoredCommit>,
    next_sha: u64,
    /// Next N host calls fail with `Unavailable`.
    transient_failures: u32,
    /// When set, `create_commit` fails with `Rejected`.
    reject_commits: bool,
    webhooks: Vec<(String, String)>,
}

/// A fully functional in-memory git host.
#[derive(Default)]
pub struct MemoryGitHost {
    state: Mutex<HostState>,
}

impl MemoryGitHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a set of file changes as a new commit and return its sha.
    ///
    /// `content = None` deletes the file. Used by tests to stand in for
    /// commits made directly on the hosting service.
    pub fn seed_commit(&self, message: &str, files: &[(&str, Option<&str>)]) -> String {
        let mut state = self.state.lock().unwrap();
        state.apply_commit(
            message,
            "remote-author",
            files
                .iter()
                .map(|(path, content)| NewFile {
                    path: (*path).to_string(),
                    content: content.map(str::to_string),
                })
                .collect(),
        )
    }

    /// Sha of the newest commit, if any.
    pub fn head(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.commits.last().map(|c| c.info.sha.clone())
    }

    /// Make the next `n` host calls fail with a transient error.
    pub fn inject_transient_failures(&self, n: u32) {
        self.state.lock().unwrap().transient_failures = n;
    }

    /// Toggle rejection of all subsequent `create_commit` calls.
    pub fn set_reject_commits(&self, reject: bool) {
        self.state.lock().unwrap().reject_commits = reject;
    }

    /// Webhook registrations seen so far.
    pub fn registered_webhooks(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().webhooks.clone()
    }
}

impl HostState {
    fn consume_failure(&mut self) -> Result<(), GitHostError> {
        if self.transient_failures > 0 {
            self.transient_failures -= 1;
            return Err(GitHostError::Unavailable("injected failure".into()));
        }
        Ok(())
    }

    fn apply_commit(&mut self, message: &str, author: &str, files: Vec<NewFile>) -> String {
        let mut snapshot = self
            .commits
            .last()
            .map(|c| c.snapshot.clone())
            .unwrap_or_default();

        let mut changes = Vec::with_capacity(files.len());
        for file in files {
            match file.content {
                Some(content) => {
                    let kind = if snapshot.contains_key(&file.path) {
                        FileChangeKind::Modified
                    } else {
                        FileChangeKind::Added
                    };
                    snapshot.insert(file.path.clone(), content);
                    changes.push(FileChange {
                        path: file.path,
                        kind,
                    });
                }
                None => {
                    snapshot.remove(&file.path);
                    changes.push(FileChange {
                        path: file.path,
                        kind: FileChangeKind::Deleted,
                    });
                }
            }
        }

        self.next_sha += 1;
        let sha = format!("c{:07x}", self.next_sha);
        self.commits.push(StoredCommit {
            info: CommitInfo {
                sha: sha.clone(),
                message: message.to_string(),
                author: author.to_string(),
                timestamp: Utc::now(),
                files: changes,
            },
            snapshot,
        });
        sha
    }
}

#[async_trait]
impl GitHost for MemoryGitHost {
    async fn fetch_commits(&self, since: Option<&str>) -> Result<Vec<CommitInfo>, GitHostError> {
        let mut state = self.state.lock().unwrap();
        state.consume_failure()?;

        let start = match since {
            None => 0,
            Some(sha) => match state.commits.iter().position(|c| c.info.sha == sha) {
                Some(pos) => pos + 1,
                None => return Err(GitHostError::NotFound(format!("commit {sha}"))),
            },
        };
        Ok(state.commits[start..]
            .iter()
            .map(|c| c.info.clone())
            .collect())
    }

    async fn get_file_contents(
        &self,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<String>, GitHostError> {
        let mut state = self.state.lock().unwrap();
        state.consume_failure()?;

        let commit = match git_ref {
            "HEAD" => state.commits.last(),
            sha => state.commits.iter().find(|c| c.info.sha == sha),
        };
        match commit {
            Some(commit) => Ok(commit.snapshot.get(path).cloned()),
            None => Err(GitHostError::NotFound(format!("ref {git_ref}"))),
        }
    }

    async fn create_commit(&self, commit: NewCommit) -> Result<String, GitHostError> {
        let mut state = self.state.lock().unwrap();
        state.consume_failure()?;

        if state.reject_commits {
            return Err(GitHostError::Rejected(
                "commit refused by host policy".into(),
            ));
        }
        Ok(state.apply_commit(&commit.message, &commit.author, commit.files))
    }

    async fn register_webhook(&self, url: &str, secret: &str) -> Result<(), GitHostError> {
        let mut state = self.state.lock().unwrap();
        state.consume_failure()?;
        state.webhooks.push((url.to_string(), secret.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn seeded_commits_are_fetchable_in_order() {
        let host = MemoryGitHost::new();
        let first = host.seed_commit("add intro", &[("docs/intro.md", Some("# Intro"))]);
        let second = host.seed_commit("add guide", &[("docs/guide.md", Some("# Guide"))]);

        let all = host.fetch_commits(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sha, first);
        assert_eq!(all[1].sha, second);

        let after_first = host.fetch_commits(Some(&first)).await.unwrap();
        assert_eq!(after_first.len(), 1);
        assert_eq!(after_first[0].sha, second);
    }

    #[tokio::test]
    async fn file_contents_are_versioned_per_commit() {
        let host = MemoryGitHost::new();
        let v1 = host.seed_commit("v1", &[("a.md", Some("one"))]);
        let v2 = host.seed_commit("v2", &[("a.md", Some("two"))]);

        assert_eq!(
            host.get_file_contents("a.md", &v1).await.unwrap().as_deref(),
            Some("one")
        );
        assert_eq!(
            host.get_file_contents("a.md", &v2).await.unwrap().as_deref(),
            Some("two")
        );
        assert_eq!(
            host.get_file_contents("a.md", "HEAD").await.unwrap().as_deref(),
            Some("two")
        );
    }

    #[tokio::test]
    async fn deletions_remove_from_snapshot_and_mark_change() {
        let host = MemoryGitHost::new();
        host.seed_commit("add", &[("a.md", Some("x"))]);
        let del = host.seed_commit("remove", &[("a.md", None)]);

        assert_eq!(host.get_file_contents("a.md", &del).await.unwrap(), None);
        let commits = host.fetch_commits(None).await.unwrap();
        assert_eq!(commits[1].files[0].kind, FileChangeKind::Deleted);
    }

    #[tokio::test]
    async fn create_commit_returns_new_head() {
        let host = MemoryGitHost::new();
        let sha = host
            .create_commit(NewCommit {
                message: "push".into(),
                author: "tester".into(),
                files: vec![NewFile {
                    path: "b.md".into(),
                    content: Some("body".into()),
                }],
            })
            .await
            .unwrap();
        assert_eq!(host.head().as_deref(), Some(sha.as_str()));
    }

    #[tokio::test]
    async fn rejection_and_transient_injection() {
        let host = MemoryGitHost::new();
        host.set_reject_commits(true);
        let result = host
            .create_commit(NewCommit {
                message: "nope".into(),
                author: "tester".into(),
                files: vec![],
            })
            .await;
        assert_matches!(result, Err(GitHostError::Rejected(_)));

        host.set_reject_commits(false);
        host.inject_transient_failures(1);
        assert_matches!(
            host.fetch_commits(None).await,
            Err(GitHostError::Unavailable(_))
        );
        assert!(host.fetch_commits(None).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_since_sha_is_not_found() {
        let host = MemoryGitHost::new();
        assert_matches!(
            host.fetch_commits(Some("missing")).await,
            Err(GitHostError::NotFound(_))
        );
    }
}
