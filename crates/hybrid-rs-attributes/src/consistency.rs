//! Checking that both sides of a hybrid attribute agree.
//!
//! A hybrid attribute is written twice, once in Rust and once as a query
//! expression, and the two can drift apart. [`ConsistencyCheck`] annotates
//! every row of a queryset with the query expression, loads the matching
//! instances, evaluates the instance body on each, and fails with
//! [`HybridError::Inconsistent`] on the first disagreement.
//!
//! Values are compared the way they come back from the database, so a
//! boolean body matches an integer column holding `0`/`1` (see
//! [`Value::loosely_equals`]).

use crate::descriptor::HybridAttribute;
use hybrid_rs_core::{HybridError, HybridResult};
use hybrid_rs_db::{DbExecutor, Model, QuerySet, Value};

/// The annotation the query-level result is read from.
pub const RESULT_ALIAS: &str = "hybrid_expression_result";

/// A consistency check of one hybrid attribute over a queryset.
pub struct ConsistencyCheck<'a, M: Model> {
    attribute: &'a dyn HybridAttribute<M>,
    scope: Option<QuerySet<M>>,
}

impl<M: Model> std::fmt::Debug for ConsistencyCheck<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyCheck")
            .field("attribute", &self.attribute.name())
            .field("scope", &self.scope)
            .finish()
    }
}

impl<'a, M: Model> ConsistencyCheck<'a, M> {
    /// Checks `attribute` over every row of `M`.
    pub fn new(attribute: &'a dyn HybridAttribute<M>) -> Self {
        Self {
            attribute,
            scope: None,
        }
    }

    /// Restricts the check to the rows of `queryset`.
    #[must_use]
    pub fn scope(mut self, queryset: QuerySet<M>) -> Self {
        self.scope = Some(queryset);
        self
    }

    /// Runs the check, returning the number of rows compared. An empty
    /// queryset passes.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::Inconsistent`] for the first row whose two
    /// values differ, or passes through usage and query errors.
    pub async fn run(self, db: &dyn DbExecutor) -> HybridResult<usize> {
        let name = self.attribute.name().to_string();
        let expression = self.attribute.class_expression()?.expression();
        let queryset = self
            .scope
            .unwrap_or_else(|| M::objects().all())
            .annotate(RESULT_ALIAS, expression);

        let rows = queryset.fetch_rows(db).await?;
        tracing::debug!(attribute = %name, rows = rows.len(), "checking hybrid attribute consistency");

        for row in &rows {
            let instance = M::from_row(row)?;
            let expression_result = row.get_value(RESULT_ALIAS).cloned().unwrap_or(Value::Null);
            let function_result = self.attribute.instance_value(&instance);
            if !expression_result.loosely_equals(&function_result) {
                let id = instance
                    .pk()
                    .or_else(|| row.get_value(M::meta().pk_column()))
                    .cloned()
                    .unwrap_or(Value::Null);
                tracing::debug!(attribute = %name, %id, "hybrid attribute mismatch");
                return Err(HybridError::Inconsistent {
                    id: id.to_string(),
                    expression: expression_result.to_string(),
                    function: function_result.to_string(),
                });
            }
        }
        Ok(rows.len())
    }
}

/// Checks that `attribute` agrees with itself on every row of `M`.
///
/// For a hybrid method, bind its arguments first with
/// [`HybridMethod::bind`](crate::descriptor::HybridMethod::bind).
///
/// # Errors
///
/// See [`ConsistencyCheck::run`].
pub async fn assert_hybrid_attributes_are_consistent<M: Model>(
    attribute: &dyn HybridAttribute<M>,
    db: &dyn DbExecutor,
) -> HybridResult<()> {
    ConsistencyCheck::new(attribute).run(db).await.map(|_| ())
}

/// Same as [`assert_hybrid_attributes_are_consistent`], over `queryset`
/// only.
///
/// # Errors
///
/// See [`ConsistencyCheck::run`].
pub async fn assert_hybrid_attributes_are_consistent_in<M: Model>(
    attribute: &dyn HybridAttribute<M>,
    queryset: QuerySet<M>,
    db: &dyn DbExecutor,
) -> HybridResult<()> {
    ConsistencyCheck::new(attribute)
        .scope(queryset)
        .run(db)
        .await
        .map(|_| ())
}
