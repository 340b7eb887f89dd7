//! # hybrid-rs-db-backends
//!
//! Database backend implementations for hybrid-rs. Each backend implements
//! [`DatabaseBackend`](base::DatabaseBackend) and the
//! [`DbExecutor`](hybrid_rs_db::DbExecutor) seam that query execution and the
//! consistency checker run through.
//!
//! Supported backends:
//! - `SQLite` (feature `sqlite`)

pub mod base;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use base::DatabaseBackend;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
