//! SQLite database backend using `rusqlite`.
//!
//! [`SqliteBackend`] implements [`DatabaseBackend`](crate::base::DatabaseBackend)
//! and [`DbExecutor`] with `rusqlite` wrapped in
//! `tokio::task::spawn_blocking`.
//!
//! - In-memory database support via the `:memory:` path (used by the tests)
//! - Foreign keys enforced, WAL journal mode for file databases
//! - A `regexp(pattern, text)` function so the `regex` and `iregex`
//!   lookups work
//! - A single connection behind a `Mutex`

use crate::base::DatabaseBackend;
use hybrid_rs_core::{DatabaseSettings, HybridError, HybridResult};
use hybrid_rs_db::query::compiler::DatabaseBackendType;
use hybrid_rs_db::value::Value;
use hybrid_rs_db::{DbExecutor, Row};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const MEMORY: &str = ":memory:";

/// A SQLite database backend.
pub struct SqliteBackend {
    /// The path to the database file (or ":memory:").
    path: PathBuf,
    /// The connection, guarded by an async mutex.
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").field("path", &self.path).finish()
    }
}

fn db_error(e: impl std::fmt::Display) -> HybridError {
    HybridError::DatabaseError(e.to_string())
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registers `regexp`, which SQLite calls for `text REGEXP pattern` as
/// `regexp(pattern, text)`. A NULL operand yields NULL. Compiled patterns
/// are cached per statement.
fn register_regexp(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            if matches!(ctx.get_raw(0), ValueRef::Null) {
                return Ok(None);
            }
            let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let text = ctx
                .get_raw(1)
                .as_str_or_null()
                .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
            Ok(text.map(|text| pattern.is_match(text)))
        },
    )
}

impl SqliteBackend {
    /// Opens a SQLite database at the given path, or an in-memory database
    /// for `:memory:`.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::OperationalError`] if the database cannot be
    /// opened or configured.
    pub fn open(path: impl Into<PathBuf>) -> HybridResult<Self> {
        let path = path.into();
        let in_memory = path.as_os_str() == MEMORY;
        let conn = if in_memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| HybridError::OperationalError(format!("SQLite open failed: {e}")))?;

        let pragmas = if in_memory {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"
        };
        conn.execute_batch(pragmas)
            .map_err(|e| HybridError::OperationalError(format!("Failed to set pragmas: {e}")))?;
        register_regexp(&conn).map_err(|e| {
            HybridError::OperationalError(format!("Failed to register regexp: {e}"))
        })?;

        tracing::debug!(path = %path.display(), "opened sqlite database");
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory() -> HybridResult<Self> {
        Self::open(MEMORY)
    }

    /// Opens the database described by a settings entry.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::ConfigurationError`] if the engine is not
    /// SQLite, or an open error.
    pub fn from_settings(settings: &DatabaseSettings) -> HybridResult<Self> {
        if !settings.engine.contains("sqlite") {
            return Err(HybridError::ConfigurationError(format!(
                "SqliteBackend cannot serve engine '{}'",
                settings.engine
            )));
        }
        Self::open(&settings.name)
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Binds `Value`s to a `rusqlite` statement.
    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> HybridResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string().as_str()),
                Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.to_string().as_str()),
                Value::Json(j) => stmt.raw_bind_parameter(idx, j.to_string().as_str()),
                Value::List(vals) => {
                    let json = serde_json::to_string(vals).map_err(db_error)?;
                    stmt.raw_bind_parameter(idx, json.as_str())
                }
            }
            .map_err(|e| HybridError::DatabaseError(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    /// Converts a `rusqlite::Row` to a generic [`Row`].
    fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> HybridResult<Row> {
        let mut values = Vec::with_capacity(column_names.len());
        for i in 0..column_names.len() {
            values.push(match sqlite_row.get_ref(i).map_err(db_error)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(v) => Value::Int(v),
                ValueRef::Real(v) => Value::Float(v),
                ValueRef::Text(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
                ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            });
        }
        Ok(Row::new(column_names.to_vec(), values))
    }

    /// Runs `f` with the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> HybridResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> HybridResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| HybridError::DatabaseError(format!("Task join error: {e}")))?
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for SqliteBackend {
    fn vendor(&self) -> &str {
        "sqlite"
    }

    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> HybridResult<u64> {
        tracing::trace!(sql = %sql, params = params.len(), "sqlite execute");
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            Self::bind_params(&mut stmt, &params)?;
            let count = stmt.raw_execute().map_err(db_error)?;
            Ok(count as u64)
        })
        .await
    }

    async fn execute_batch(&self, sql: &str) -> HybridResult<()> {
        tracing::trace!(sql = %sql, "sqlite execute_batch");
        let sql = sql.to_string();
        self.with_conn(move |conn| conn.execute_batch(&sql).map_err(db_error))
            .await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> HybridResult<Vec<Row>> {
        tracing::trace!(sql = %sql, params = params.len(), "sqlite query");
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            let column_names: Vec<String> =
                stmt.column_names().into_iter().map(String::from).collect();
            Self::bind_params(&mut stmt, &params)?;

            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows.next().map_err(db_error)? {
                rows.push(Self::convert_row(row, &column_names)?);
            }
            Ok(rows)
        })
        .await
    }
}

#[async_trait::async_trait]
impl DbExecutor for SqliteBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> HybridResult<u64> {
        self.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> HybridResult<Vec<Row>> {
        DatabaseBackend::query(self, sql, params).await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> HybridResult<Value> {
        tracing::trace!(sql = %sql, params = params.len(), "sqlite insert");
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            Self::bind_params(&mut stmt, &params)?;
            stmt.raw_execute().map_err(db_error)?;
            Ok(Value::Int(conn.last_insert_rowid()))
        })
        .await
    }
}
