//! The result of comparing a hybrid expression against a value.
//!
//! A [`HybridFilter`] is applied to a queryset in two steps: the resolved
//! expression is annotated under the filter's alias, then the queryset is
//! filtered (or excluded) on `<alias>__<lookup>`. When the compared value is
//! itself a [`HybridExpression`](crate::expression::HybridExpression) it is
//! annotated as well and the lookup compares against that annotation.

use crate::alias::AliasSource;
use crate::expression::{FilterValue, Polarity};
use hybrid_rs_core::{HybridError, HybridResult};
use hybrid_rs_db::query::compiler::LOOKUP_SEP;
use hybrid_rs_db::{Expression, Lookup, Model, QuerySet, Q};
use std::fmt;
use std::sync::Arc;

/// A pending filter built from one comparison. Applying it consumes it.
pub struct HybridFilter {
    expr: Expression,
    value: FilterValue,
    lookup: String,
    polarity: Polarity,
    alias: String,
    aliases: Arc<dyn AliasSource>,
}

impl fmt::Debug for HybridFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridFilter")
            .field("expr", &self.expr)
            .field("value", &self.value)
            .field("lookup", &self.lookup)
            .field("polarity", &self.polarity)
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

impl HybridFilter {
    /// Creates a filter. Without an `alias`, one is drawn from `aliases`.
    pub fn new(
        expr: Expression,
        value: FilterValue,
        lookup: impl Into<String>,
        polarity: Polarity,
        alias: Option<String>,
        aliases: Arc<dyn AliasSource>,
    ) -> Self {
        let alias = alias.unwrap_or_else(|| aliases.next_alias());
        let lookup = lookup.into();
        tracing::debug!(alias = %alias, lookup = %lookup, ?polarity, "built hybrid filter");
        Self {
            expr,
            value,
            lookup,
            polarity,
            alias,
            aliases,
        }
    }

    /// The resolved expression.
    pub const fn expression(&self) -> &Expression {
        &self.expr
    }

    /// The compared value.
    pub const fn value(&self) -> &FilterValue {
        &self.value
    }

    /// The final lookup name.
    pub fn lookup(&self) -> &str {
        &self.lookup
    }

    /// Whether the filter keeps or drops matching rows.
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// The annotation alias the expression is bound to.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Returns the keyword this filter applies, `<alias>__<lookup>`.
    pub fn keyword(&self) -> String {
        format!("{}{LOOKUP_SEP}{}", self.alias, self.lookup)
    }

    /// Applies the filter to `queryset`, returning the narrowed queryset.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::Usage`] when the queryset already carries an
    /// annotation under the filter's alias (or the compared expression's
    /// alias), and passes through the query layer's error for an unknown
    /// lookup name.
    pub fn apply<M: Model>(self, queryset: QuerySet<M>) -> HybridResult<QuerySet<M>> {
        let keyword = self.keyword();
        ensure_unused(&queryset, &self.alias)?;
        let mut qs = queryset.annotate(self.alias.clone(), self.expr);

        let operand = match self.value {
            FilterValue::Value(value) => Expression::Value(value),
            FilterValue::Expression(target) => {
                let target_alias = target
                    .alias()
                    .map_or_else(|| self.aliases.next_alias(), str::to_string);
                ensure_unused(&qs, &target_alias)?;
                qs = qs.annotate(target_alias.clone(), target.resolve());
                Expression::f(target_alias)
            }
        };

        let q = Q::filter(self.alias, Lookup::from_name(&self.lookup, operand)?);
        tracing::debug!(table = %M::table_name(), keyword = %keyword, polarity = ?self.polarity, "applying hybrid filter");
        Ok(match self.polarity {
            Polarity::Include => qs.filter(q),
            Polarity::Exclude => qs.exclude(q),
        })
    }
}

fn ensure_unused<M: Model>(queryset: &QuerySet<M>, alias: &str) -> HybridResult<()> {
    if queryset.query().annotation(alias).is_some() {
        return Err(HybridError::Usage(format!(
            "The annotation '{alias}' is already set on this queryset; \
             give each hybrid filter its own alias"
        )));
    }
    Ok(())
}
