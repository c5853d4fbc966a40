//! Git-host failure taxonomy.
//!
//! The split matters for retry behavior: [`GitHostError::Unavailable`] is
//! transient and retried with bounded backoff; everything else is
//! permanent and surfaced immediately.

#[derive(Debug, thiserror::Error)]
pub enum GitHostError {
    /// The host could not be reached or answered with a transient failure.
    #[error("Git host unavailable: {0}")]
    Unavailable(String),

    /// The host refused the operation (e.g. rejected a commit).
    #[error("Git host rejected the operation: {0}")]
    Rejected(String),

    /// A ref, commit, or repository the caller named does not exist.
    #[error("Not found on git host: {0}")]
    NotFound(String),
}

impl GitHostError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GitHostError::Unavailable(_))
    }
}
