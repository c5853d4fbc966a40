//! Orchestration layer for leafpress: page tree management, the version
//! log, bidirectional git synchronization, and the change request
//! workflow.
//!
//! Services are constructed over the [`leafpress_db::store::Store`] and
//! [`leafpress_git::GitHost`] collaborators and publish
//! [`leafpress_events::DomainEvent`]s for everything that changes state:
//!
//! - [`tree::TreeService`] — page creation, moves, ordering, traversal.
//! - [`versions::VersionService`] — content updates and version restore.
//! - [`sync::SyncEngine`] — pull/push runs, webhooks, conflict
//!   resolution.
//! - [`change_requests::ChangeRequestService`] — review workflow and
//!   merge.
//! - [`watchdog`] — background sweep releasing stuck sync runs.

pub mod change_requests;
pub mod config;
pub mod sync;
pub mod tree;
pub mod versions;
pub mod watchdog;

pub use change_requests::ChangeRequestService;
pub use config::EngineConfig;
pub use sync::{SyncEngine, WebhookPayload};
pub use tree::{PageTreeNode, TreeService};
pub use versions::VersionService;
