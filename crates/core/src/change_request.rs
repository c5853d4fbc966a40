//! Change-request review state machine and approval policy.
//!
//! Statuses form a closed machine:
//! `draft → pending_review → in_review → {approved, rejected} → {merged, closed}`.
//! Transition legality depends on the actor's relationship to the change
//! request (creator vs. assigned reviewer); violations are
//! [`CoreError::Forbidden`], matching the error taxonomy used for invalid
//! state transitions.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestStatus {
    Draft,
    PendingReview,
    InReview,
    Approved,
    Rejected,
    Merged,
    Closed,
}

impl ChangeRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestStatus::Draft => "draft",
            ChangeRequestStatus::PendingReview => "pending_review",
            ChangeRequestStatus::InReview => "in_review",
            ChangeRequestStatus::Approved => "approved",
            ChangeRequestStatus::Rejected => "rejected",
            ChangeRequestStatus::Merged => "merged",
            ChangeRequestStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(ChangeRequestStatus::Draft),
            "pending_review" => Ok(ChangeRequestStatus::PendingReview),
            "in_review" => Ok(ChangeRequestStatus::InReview),
            "approved" => Ok(ChangeRequestStatus::Approved),
            "rejected" => Ok(ChangeRequestStatus::Rejected),
            "merged" => Ok(ChangeRequestStatus::Merged),
            "closed" => Ok(ChangeRequestStatus::Closed),
            other => Err(CoreError::Internal(format!(
                "Unknown change request status '{other}'"
            ))),
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChangeRequestStatus::Merged | ChangeRequestStatus::Closed)
    }
}

// ---------------------------------------------------------------------------
// Actions and actors
// ---------------------------------------------------------------------------

/// Review-workflow actions (merge is a separate, lock-holding operation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestAction {
    SubmitForReview,
    StartReview,
    Approve,
    Reject,
    Close,
}

/// The acting user's relationship to a change request.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i64,
    pub is_creator: bool,
    pub is_reviewer: bool,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Compute the status after applying `action`, or `Forbidden` when the
/// transition is illegal for this status/actor combination.
pub fn transition(
    current: ChangeRequestStatus,
    action: ChangeRequestAction,
    actor: Actor,
) -> Result<ChangeRequestStatus, CoreError> {
    use ChangeRequestAction as A;
    use ChangeRequestStatus as S;

    let next = match (current, action) {
        (S::Draft, A::SubmitForReview) if actor.is_creator => S::PendingReview,
        (S::PendingReview, A::StartReview) if actor.is_reviewer => S::InReview,
        (S::PendingReview | S::InReview, A::Approve) if actor.is_reviewer => S::Approved,
        (S::PendingReview | S::InReview, A::Reject) if actor.is_reviewer => S::Rejected,
        (current, A::Close) if !current.is_terminal() && (actor.is_creator || actor.is_reviewer) => {
            S::Closed
        }
        _ => {
            return Err(CoreError::Forbidden(format!(
                "Cannot apply {action:?} to a {} change request as user {}",
                current.as_str(),
                actor.user_id
            )))
        }
    };
    Ok(next)
}

/// Check whether a change request in `status` may merge under the space's
/// review policy.
///
/// Merging requires `approved` status unless the space requires zero
/// approvals, in which case any open (non-terminal, non-rejected) change
/// request may merge.
pub fn check_mergeable(
    status: ChangeRequestStatus,
    required_approvals: i32,
) -> Result<(), CoreError> {
    use ChangeRequestStatus as S;
    match status {
        S::Approved => Ok(()),
        S::Draft | S::PendingReview | S::InReview if required_approvals == 0 => Ok(()),
        S::Merged => Err(CoreError::Forbidden(
            "Change request is already merged".into(),
        )),
        other => Err(CoreError::Forbidden(format!(
            "Cannot merge a {} change request; approval is required",
            other.as_str()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Review status
// ---------------------------------------------------------------------------

/// Status of a single reviewer's review; one record per
/// (change request, reviewer), upserted rather than appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    ChangesRequested,
    Commented,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::ChangesRequested => "changes_requested",
            ReviewStatus::Commented => "commented",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "changes_requested" => Ok(ReviewStatus::ChangesRequested),
            "commented" => Ok(ReviewStatus::Commented),
            other => Err(CoreError::Internal(format!(
                "Unknown review status '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
