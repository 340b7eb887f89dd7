//! # hybrid-rs
//!
//! Hybrid attributes for Rust models.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `hybrid-rs` to get everything, or depend on individual
//! crates for finer-grained control.

/// Error taxonomy, settings, and logging setup.
pub use hybrid_rs_core as core;

/// Query layer: models, `QuerySet`, Manager, expressions, and compilation.
pub use hybrid_rs_db as db;

/// Database backends.
pub use hybrid_rs_db_backends as db_backends;

/// Hybrid properties, methods, filters, and the consistency checker.
pub use hybrid_rs_attributes as attributes;

// Third-party re-exports
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;

/// The types most programs using hybrid attributes need.
pub mod prelude {
    pub use hybrid_rs_attributes::{
        assert_hybrid_attributes_are_consistent, Access, HybridExpression, HybridManager,
        HybridMethod, HybridProperty, HybridQuerySetExt,
    };
    pub use hybrid_rs_core::{HybridError, HybridResult, Settings};
    pub use hybrid_rs_db::{DbExecutor, Expression, Model, OrderBy, QuerySet, Value, Q};
    #[cfg(feature = "sqlite")]
    pub use hybrid_rs_db_backends::SqliteBackend;
}
