//! Base database backend trait.
//!
//! [`DatabaseBackend`] is the uniform interface each database engine
//! implements. Backends also implement
//! [`DbExecutor`](hybrid_rs_db::DbExecutor), which is all query execution
//! needs.

use hybrid_rs_core::{HybridError, HybridResult};
use hybrid_rs_db::query::compiler::{DatabaseBackendType, SqlCompiler};
use hybrid_rs_db::value::Value;
use hybrid_rs_db::Row;

/// The core trait for database backends.
///
/// All methods are async because database operations are I/O-bound. Backends
/// built on synchronous drivers (like `rusqlite`) wrap operations in
/// `spawn_blocking` to keep the async interface.
#[async_trait::async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Returns the vendor name (e.g., "sqlite").
    fn vendor(&self) -> &str;

    /// Returns the backend type enum for use with the SQL compiler.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Executes a SQL statement that does not return rows.
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> HybridResult<u64>;

    /// Executes several `;`-separated statements without parameters.
    async fn execute_batch(&self, sql: &str) -> HybridResult<()>;

    /// Executes a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> HybridResult<Vec<Row>>;

    /// Executes a SQL query and returns exactly one row.
    ///
    /// Returns [`HybridError::DoesNotExist`] if no rows are returned, or
    /// [`HybridError::MultipleObjectsReturned`] if more than one is.
    async fn query_one(&self, sql: &str, params: &[Value]) -> HybridResult<Row> {
        let mut rows = self.query(sql, params).await?;
        match rows.len() {
            0 => Err(HybridError::DoesNotExist("No rows returned".to_string())),
            1 => Ok(rows.remove(0)),
            n => Err(HybridError::MultipleObjectsReturned(format!(
                "Expected 1 row, got {n}"
            ))),
        }
    }

    /// Returns a SQL compiler configured for this backend's dialect.
    fn compiler(&self) -> SqlCompiler {
        SqlCompiler::new(self.backend_type())
    }
}
