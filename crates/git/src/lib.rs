//! Repository collaborator for the leafpress sync engine.
//!
//! The engine never speaks a concrete git-hosting wire protocol; it works
//! against the [`GitHost`] trait. This crate provides:
//!
//! - [`host`] — the trait and its commit/file types.
//! - [`error`] — [`GitHostError`] split into transient and permanent
//!   failures.
//! - [`retry`] — bounded exponential backoff for transient failures.
//! - [`memory`] — [`MemoryGitHost`], a fully functional in-memory host
//!   used by tests and local development.

pub mod error;
pub mod host;
pub mod memory;
pub mod retry;

pub use error::GitHostError;
pub use host::{CommitInfo, FileChange, FileChangeKind, GitHost, NewCommit, NewFile};
pub use memory::MemoryGitHost;
pub use retry::{with_retry, RetryPolicy};
