//! QuerySet and Manager for building and executing database queries.
//!
//! The [`QuerySet`] represents a lazy database query that builds up a SQL query
//! AST. It only executes when a terminal method is called. The [`Manager`] is
//! the entry point for accessing querysets on a model, equivalent to Django's
//! `objects` manager.

use super::compiler::{DatabaseBackendType, OrderBy, Query, SelectColumn, SqlCompiler, WhereNode};
use super::expressions::Expression;
use super::lookups::Q;
use super::row::Row;
use crate::executor::DbExecutor;
use crate::model::Model;
use crate::value::Value;
use hybrid_rs_core::{HybridError, HybridResult};
use std::fmt;
use std::marker::PhantomData;

/// The entry point for model-level query operations.
///
/// The `Manager` does not hold any query state; it creates fresh
/// `QuerySet` instances.
pub struct Manager<M: Model> {
    _phantom: PhantomData<M>,
}

impl<M: Model> fmt::Debug for Manager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager").field("model", &M::table_name()).finish()
    }
}

impl<M: Model> Default for Manager<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Manager<M> {
    /// Creates a new manager.
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }

    /// Returns a new `QuerySet` that returns all objects.
    pub fn all(&self) -> QuerySet<M> {
        QuerySet::new()
    }

    /// Returns a new `QuerySet` with the given filter applied.
    pub fn filter(&self, q: Q) -> QuerySet<M> {
        self.all().filter(q)
    }

    /// Returns a new `QuerySet` with the given exclusion applied.
    pub fn exclude(&self, q: Q) -> QuerySet<M> {
        self.all().exclude(q)
    }

    /// Returns an empty `QuerySet` that matches nothing.
    pub fn none(&self) -> QuerySet<M> {
        self.all().none()
    }
}

/// A lazy, composable database query.
///
/// `QuerySet` builds a [`Query`] AST through method chaining. All
/// filtering, annotation, and ordering methods consume `self` and return the
/// modified queryset; clone first to keep the original.
pub struct QuerySet<M: Model> {
    model: PhantomData<M>,
    query: Query,
    is_none: bool,
}

impl<M: Model> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        Self {
            model: PhantomData,
            query: self.query.clone(),
            is_none: self.is_none,
        }
    }
}

impl<M: Model> fmt::Debug for QuerySet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("query", &self.query)
            .field("is_none", &self.is_none)
            .finish()
    }
}

impl<M: Model> QuerySet<M> {
    fn new() -> Self {
        Self {
            model: PhantomData,
            query: Query::for_model(M::meta()),
            is_none: false,
        }
    }

    /// Returns a reference to the underlying query AST.
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Returns `true` if this queryset was emptied with [`none`](Self::none).
    pub const fn is_none(&self) -> bool {
        self.is_none
    }

    // ── Filtering methods (lazy) ─────────────────────────────────────

    /// Adds a filter condition.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        self.query.add_where(WhereNode::from_q(&q));
        self
    }

    /// Adds an exclusion condition (NOT).
    #[must_use]
    pub fn exclude(mut self, q: Q) -> Self {
        self.query
            .add_where(WhereNode::Not(Box::new(WhereNode::from_q(&q))));
        self
    }

    /// Adds an annotation (computed expression with an alias). Annotating
    /// an alias twice keeps the last expression.
    #[must_use]
    pub fn annotate(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.query.annotate(name, expr);
        self
    }

    /// Sets the ordering. Field paths and annotation aliases are accepted.
    #[must_use]
    pub fn order_by(mut self, fields: Vec<OrderBy>) -> Self {
        self.query.order_by = fields;
        self
    }

    /// Selects specific field paths instead of whole rows.
    #[must_use]
    pub fn values(mut self, fields: &[&str]) -> Self {
        self.query.select = fields
            .iter()
            .map(|f| SelectColumn::Column((*f).to_string()))
            .collect();
        self
    }

    /// Adds DISTINCT to the query.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }

    /// Returns an empty queryset.
    #[must_use]
    pub fn none(mut self) -> Self {
        self.is_none = true;
        self
    }

    /// Sets the LIMIT.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.query.limit = Some(n);
        self
    }

    /// Sets the OFFSET.
    #[must_use]
    pub fn offset(mut self, n: usize) -> Self {
        self.query.offset = Some(n);
        self
    }

    // ── SQL generation (for inspection/debugging) ────────────────────

    /// Compiles the queryset to SQL for the given backend.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::FieldError`] for unresolvable field paths.
    pub fn to_sql(&self, backend: DatabaseBackendType) -> HybridResult<(String, Vec<Value>)> {
        if self.is_none {
            return Ok((
                format!("SELECT * FROM \"{}\" WHERE 1=0", self.query.table),
                vec![],
            ));
        }
        SqlCompiler::new(backend).compile_select(&self.query)
    }

    // ── Async execution methods ───────────────────────────────────────

    /// Executes the query and returns the raw rows, annotations included.
    ///
    /// # Errors
    ///
    /// Propagates compilation and database errors.
    pub async fn fetch_rows(&self, db: &dyn DbExecutor) -> HybridResult<Vec<Row>> {
        if self.is_none {
            return Ok(Vec::new());
        }
        let (sql, params) = self.to_sql(db.backend_type())?;
        tracing::debug!(table = %self.query.table, sql = %sql, "executing query");
        db.query(&sql, &params).await
    }

    /// Executes the query and returns all matching model instances.
    ///
    /// # Errors
    ///
    /// Propagates compilation, database, and row conversion errors.
    pub async fn execute_query(&self, db: &dyn DbExecutor) -> HybridResult<Vec<M>> {
        let rows = self.fetch_rows(db).await?;
        rows.iter().map(M::from_row).collect()
    }

    /// Returns the count of matching records.
    ///
    /// # Errors
    ///
    /// Propagates compilation and database errors.
    pub async fn count_exec(&self, db: &dyn DbExecutor) -> HybridResult<i64> {
        if self.is_none {
            return Ok(0);
        }
        let (sql, params) = SqlCompiler::new(db.backend_type()).compile_count(&self.query)?;
        let rows = db.query(&sql, &params).await?;
        rows.first().map_or(Ok(0), |row| row.get::<i64>("__count"))
    }

    /// Returns a single matching record.
    ///
    /// # Errors
    ///
    /// Returns `DoesNotExist` if no records match, or
    /// `MultipleObjectsReturned` if more than one record matches.
    pub async fn get_exec(&self, db: &dyn DbExecutor) -> HybridResult<M> {
        let mut rows = self.clone().limit(2).fetch_rows(db).await?;
        match rows.len() {
            0 => Err(HybridError::DoesNotExist(format!(
                "{} matching query does not exist.",
                M::meta().model_name
            ))),
            1 => M::from_row(&rows.remove(0)),
            n => Err(HybridError::MultipleObjectsReturned(format!(
                "get() returned more than one {} -- it returned {n}!",
                M::meta().model_name
            ))),
        }
    }
}
