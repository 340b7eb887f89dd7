//! Core error types for hybrid-rs.
//!
//! [`HybridError`] covers the three families of failure the hybrid
//! attribute engine can surface:
//!
//! - **usage** errors: the caller misused the API (an expression body was
//!   never registered, a relation path ends with the separator, a
//!   read-only property was assigned to). These fail fast.
//! - **consistency** errors: the instance-level body and the query-level
//!   expression of a hybrid attribute disagree for some row.
//! - **substrate** errors: raised by the query layer or a database backend
//!   and passed through untouched.

use thiserror::Error;

/// The family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller misused the API.
    Usage,
    /// Instance-level and query-level evaluation disagree.
    Consistency,
    /// Raised by the query layer or a database backend.
    Substrate,
    /// Settings could not be loaded or are invalid.
    Configuration,
}

/// The primary error type for hybrid-rs.
#[derive(Error, Debug)]
pub enum HybridError {
    // ── Usage errors ─────────────────────────────────────────────────

    /// The API was used in a way it does not support.
    #[error("Usage error: {0}")]
    Usage(String),

    /// A hybrid property was assigned to or deleted without a registered
    /// setter/deleter.
    #[error("Attribute error: {0}")]
    AttributeError(String),

    /// A hybrid attribute was used at query level before its expression
    /// body was registered.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Consistency errors ───────────────────────────────────────────

    /// The query-level expression and the instance-level body of a hybrid
    /// attribute produced different values for the same row.
    #[error("Hybrid expression/function mismatch for id={id}. Expr=\"{expression}\" x Func=\"{function}\"")]
    Inconsistent {
        /// The primary key of the offending row.
        id: String,
        /// The value computed by the database.
        expression: String,
        /// The value computed in memory.
        function: String,
    },

    // ── Substrate errors ─────────────────────────────────────────────

    /// An unknown field, relation, or lookup was referenced.
    #[error("Field error: {0}")]
    FieldError(String),

    /// Raised when a query expected exactly one result but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// Raised when a query expected exactly one result but found multiple.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// A generic database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HybridError {
    /// Returns the family this error belongs to.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Usage(_) | Self::AttributeError(_) | Self::ImproperlyConfigured(_) => {
                ErrorCategory::Usage
            }
            Self::Inconsistent { .. } => ErrorCategory::Consistency,
            Self::FieldError(_)
            | Self::DoesNotExist(_)
            | Self::MultipleObjectsReturned(_)
            | Self::DatabaseError(_)
            | Self::OperationalError(_) => ErrorCategory::Substrate,
            Self::ConfigurationError(_) | Self::IoError(_) => ErrorCategory::Configuration,
        }
    }

    /// Returns `true` if this error reports caller misuse.
    pub const fn is_usage_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Usage)
    }
}

/// A convenience type alias for `Result<T, HybridError>`.
pub type HybridResult<T> = Result<T, HybridError>;
