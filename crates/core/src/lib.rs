//! Pure domain logic for the leafpress content platform.
//!
//! This crate has no internal dependencies and no I/O so it can be used by
//! the db layer, the sync engine, and any future CLI or worker tooling:
//!
//! - [`types`] — shared id/timestamp aliases.
//! - [`error`] — the [`CoreError`](error::CoreError) taxonomy.
//! - [`slug`] — slug generation and page-path arithmetic.
//! - [`content`] — the page/block content tree ([`PageContent`](content::PageContent)).
//! - [`markdown`] — the git mapping layer: deterministic, reversible
//!   translation between a content tree and its flat-file form.
//! - [`merge`] — the three-way conflict resolver.
//! - [`change_request`] — the change-request review state machine.
//! - [`sync`] — sync status state machine and run bookkeeping enums.
//! - [`diff`] — line and block diff utilities.

pub mod change_request;
pub mod content;
pub mod diff;
pub mod error;
pub mod markdown;
pub mod merge;
pub mod slug;
pub mod sync;
pub mod types;
