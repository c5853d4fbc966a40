//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument. Methods that must run
//! inside a caller-owned transaction take `&mut PgConnection` instead.

pub mod block_repo;
pub mod change_request_repo;
pub mod git_branch_repo;
pub mod git_commit_repo;
pub mod git_sync_config_repo;
pub mod page_repo;
pub mod page_version_repo;
pub mod review_repo;
pub mod space_repo;
pub mod sync_history_repo;

pub use block_repo::BlockRepo;
pub use change_request_repo::ChangeRequestRepo;
pub use git_branch_repo::GitBranchRepo;
pub use git_commit_repo::GitCommitRepo;
pub use git_sync_config_repo::GitSyncConfigRepo;
pub use page_repo::PageRepo;
pub use page_version_repo::PageVersionRepo;
pub use review_repo::ReviewRepo;
pub use space_repo::SpaceRepo;
pub use sync_history_repo::SyncHistoryRepo;
