//! Persistence layer for the leafpress content platform.
//!
//! - [`models`] — row structs and create/update DTOs, one file per
//!   aggregate.
//! - [`repositories`] — stateless sqlx repositories over `&PgPool`.
//! - [`store`] — the persistence-collaborator traits the engine depends
//!   on, with two backends: [`store::PgStore`] (Postgres, delegating to
//!   the repositories) and [`store::MemoryStore`] (arena-backed, used by
//!   tests and embedders without a database).

pub mod models;
pub mod repositories;
pub mod store;

/// Embedded migrations; embedders run `MIGRATOR.run(&pool)` at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
