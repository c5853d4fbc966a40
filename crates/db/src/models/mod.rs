//! Database models: row structs and create/update DTOs.

pub mod block;
pub mod change_request;
pub mod git_branch;
pub mod git_commit;
pub mod git_sync_config;
pub mod page;
pub mod page_version;
pub mod review;
pub mod space;
pub mod sync_history;

pub use block::{assemble_content, flatten_content, Block, FlatBlock};
pub use change_request::{
    ChangeRequest, ChangeRequestChange, NewChange, NewChangeRequest, CHANGE_TYPE_CREATE,
    CHANGE_TYPE_DELETE, CHANGE_TYPE_UPDATE,
};
pub use git_branch::GitBranch;
pub use git_commit::{GitCommitRecord, NewCommitRecord};
pub use git_sync_config::{GitSyncConfig, NewSyncConfig};
pub use page::{NewPage, Page, PageRelocation};
pub use page_version::PageVersion;
pub use review::Review;
pub use space::{NewSpace, Space};
pub use sync_history::{NewSyncHistory, SyncCounts, SyncHistory};
