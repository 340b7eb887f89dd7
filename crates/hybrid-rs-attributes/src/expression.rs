//! The query-level side of a hybrid attribute.
//!
//! [`HybridExpression`] is what a hybrid property or method resolves to when
//! accessed on the model type rather than on an instance. It holds the
//! registered expression body plus pending lookup configuration, and every
//! configuration method returns a new value. Comparing it against a value
//! does not produce a boolean: it produces a
//! [`HybridFilter`](crate::filter::HybridFilter) that a queryset can apply.
//!
//! ```
//! use hybrid_rs_attributes::{Comparison, HybridExpression};
//! use hybrid_rs_db::Expression;
//!
//! let sum = HybridExpression::new("magic_number_sum", |through: &str| {
//!     Expression::f(format!("{through}magic_number1"))
//!         + Expression::f(format!("{through}magic_number2"))
//! });
//!
//! let directive = sum.clone().case_insensitive().with_lookup("startswith").eq("4");
//! assert_eq!(directive.lookup(), "startswith");
//! assert!(!sum.is_case_insensitive());
//! assert_eq!(sum.compare(Comparison::Lte, 5).lookup(), "lte");
//! ```

use crate::alias::{default_alias_source, AliasSource};
use crate::filter::HybridFilter;
use hybrid_rs_core::{HybridError, HybridResult};
use hybrid_rs_db::query::compiler::LOOKUP_SEP;
use hybrid_rs_db::{Expression, Value};
use std::fmt;
use std::sync::Arc;

/// Builds the query expression of a hybrid attribute.
///
/// The argument is the relation path prefix (`""` or `"student__"`) every
/// field reference inside the expression must start with.
pub type ExpressionProducer = Arc<dyn Fn(&str) -> Expression + Send + Sync>;

/// Whether a filter keeps or drops the rows it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Keep matching rows (`QuerySet::filter`).
    #[default]
    Include,
    /// Drop matching rows (`QuerySet::exclude`).
    Exclude,
}

impl Polarity {
    /// Returns the opposite polarity.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Include => Self::Exclude,
            Self::Exclude => Self::Include,
        }
    }
}

/// A comparison operator applied to a [`HybridExpression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `==` (also spelled `is`)
    Eq,
    /// `!=`: exclusion of `==`, never a lookup of its own.
    Ne,
}

impl Comparison {
    /// Parses an operator symbol.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::Usage`] for symbols with no lookup mapping.
    pub fn from_symbol(symbol: &str) -> HybridResult<Self> {
        match symbol {
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Lte),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Gte),
            "==" | "is" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            other => Err(HybridError::Usage(format!(
                "No lookup is mapped to the operator '{other}'"
            ))),
        }
    }

    /// Returns the base lookup name. `Ne` maps to `exact` because it is
    /// applied as an exclusion.
    pub const fn lookup_name(self) -> &'static str {
        match self {
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Eq | Self::Ne => "exact",
        }
    }
}

/// The right-hand side of a comparison: a literal or another hybrid
/// expression.
#[derive(Debug, Clone)]
pub enum FilterValue {
    /// A literal value.
    Value(Value),
    /// Another hybrid expression, annotated on the queryset when the filter
    /// is applied.
    Expression(HybridExpression),
}

impl From<HybridExpression> for FilterValue {
    fn from(expr: HybridExpression) -> Self {
        Self::Expression(expr)
    }
}

macro_rules! filter_value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(v: $ty) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

filter_value_from!(Value, bool, i32, i64, f64, &str, String);

/// A deferred query expression plus the lookup configuration of one
/// comparison.
#[derive(Clone)]
pub struct HybridExpression {
    name: String,
    producer: ExpressionProducer,
    path_prefix: String,
    ignore_case: bool,
    polarity: Polarity,
    forced_lookup: Option<String>,
    alias: Option<String>,
    aliases: Arc<dyn AliasSource>,
}

impl fmt::Debug for HybridExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridExpression")
            .field("name", &self.name)
            .field("path_prefix", &self.path_prefix)
            .field("ignore_case", &self.ignore_case)
            .field("polarity", &self.polarity)
            .field("forced_lookup", &self.forced_lookup)
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

impl HybridExpression {
    /// Creates an expression with default configuration: case-sensitive,
    /// including, no forced lookup or alias.
    pub fn new(
        name: impl Into<String>,
        producer: impl Fn(&str) -> Expression + Send + Sync + 'static,
    ) -> Self {
        Self::from_producer(name, Arc::new(producer))
    }

    /// Creates an expression from an already shared producer.
    pub fn from_producer(name: impl Into<String>, producer: ExpressionProducer) -> Self {
        Self {
            name: name.into(),
            producer,
            path_prefix: String::new(),
            ignore_case: false,
            polarity: Polarity::Include,
            forced_lookup: None,
            alias: None,
            aliases: default_alias_source(),
        }
    }

    /// The name of the hybrid attribute this expression came from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether comparisons use the `i`-prefixed lookups.
    pub const fn is_case_insensitive(&self) -> bool {
        self.ignore_case
    }

    /// Whether comparisons filter or exclude.
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// The lookup forced with [`with_lookup`](Self::with_lookup).
    pub fn forced_lookup(&self) -> Option<&str> {
        self.forced_lookup.as_deref()
    }

    /// The alias forced with [`with_alias`](Self::with_alias).
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The relation path prefix field references are resolved under.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    // ── Configuration (each returns a new expression) ────────────────

    /// Uses the case-insensitive variant of the comparison lookup.
    #[must_use]
    pub fn case_insensitive(&self) -> Self {
        Self {
            ignore_case: true,
            ..self.clone()
        }
    }

    /// Forces a lookup name, used verbatim regardless of case sensitivity.
    #[must_use]
    pub fn with_lookup(&self, lookup: impl Into<String>) -> Self {
        Self {
            forced_lookup: Some(lookup.into()),
            ..self.clone()
        }
    }

    /// Forces the annotation alias, so it can be referred to later (in an
    /// `order_by`, for instance). Keeping it unique within one query is up
    /// to the caller.
    #[must_use]
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..self.clone()
        }
    }

    /// Replaces the source of generated aliases.
    #[must_use]
    pub fn with_alias_source(&self, aliases: Arc<dyn AliasSource>) -> Self {
        Self {
            aliases,
            ..self.clone()
        }
    }

    /// Toggles between filtering and excluding.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            polarity: self.polarity.toggled(),
            ..self.clone()
        }
    }

    /// Evaluates the expression relative to a related model reached through
    /// `path` (`"student"`, `"classroom__teacher"`). The separator after the
    /// path is added here. A second call replaces the first path.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::Usage`] if `path` already ends with `__`.
    pub fn through(&self, path: &str) -> HybridResult<Self> {
        if path.ends_with(LOOKUP_SEP) {
            return Err(HybridError::Usage(format!(
                "Relation path '{path}' must not end with '{LOOKUP_SEP}'; it is appended automatically"
            )));
        }
        Ok(Self {
            path_prefix: format!("{path}{LOOKUP_SEP}"),
            ..self.clone()
        })
    }

    // ── Resolution ───────────────────────────────────────────────────

    /// Builds the query expression. Calling it repeatedly yields equal
    /// expressions.
    pub fn resolve(&self) -> Expression {
        (self.producer)(&self.path_prefix)
    }

    /// The raw expression, for direct use in `QuerySet::annotate`.
    pub fn expression(&self) -> Expression {
        self.resolve()
    }

    /// Returns the lookup a comparison with `op` would use: the forced
    /// lookup if any, else the base lookup, `i`-prefixed when case
    /// insensitive.
    pub fn lookup_for(&self, op: Comparison) -> String {
        match &self.forced_lookup {
            Some(lookup) => lookup.clone(),
            None if self.ignore_case => format!("i{}", op.lookup_name()),
            None => op.lookup_name().to_string(),
        }
    }

    // ── Comparisons ──────────────────────────────────────────────────

    /// Compares this expression against `value`, producing a filter.
    ///
    /// `Ne` negates the expression and compares with `Eq`.
    pub fn compare(&self, op: Comparison, value: impl Into<FilterValue>) -> HybridFilter {
        if op == Comparison::Ne {
            return self.negate().compare(Comparison::Eq, value);
        }
        let lookup = self.lookup_for(op);
        HybridFilter::new(
            self.resolve(),
            value.into(),
            lookup,
            self.polarity,
            self.alias.clone(),
            Arc::clone(&self.aliases),
        )
    }

    /// Compares using an operator symbol (`"<"`, `"=="`, `"is"`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::Usage`] for unknown symbols.
    pub fn compare_symbol(&self, symbol: &str, value: impl Into<FilterValue>) -> HybridResult<HybridFilter> {
        Ok(self.compare(Comparison::from_symbol(symbol)?, value))
    }

    /// `self < value`
    pub fn lt(&self, value: impl Into<FilterValue>) -> HybridFilter {
        self.compare(Comparison::Lt, value)
    }

    /// `self <= value`
    pub fn lte(&self, value: impl Into<FilterValue>) -> HybridFilter {
        self.compare(Comparison::Lte, value)
    }

    /// `self > value`
    pub fn gt(&self, value: impl Into<FilterValue>) -> HybridFilter {
        self.compare(Comparison::Gt, value)
    }

    /// `self >= value`
    pub fn gte(&self, value: impl Into<FilterValue>) -> HybridFilter {
        self.compare(Comparison::Gte, value)
    }

    /// `self == value`
    pub fn eq(&self, value: impl Into<FilterValue>) -> HybridFilter {
        self.compare(Comparison::Eq, value)
    }

    /// Same as [`eq`](Self::eq).
    pub fn is(&self, value: impl Into<FilterValue>) -> HybridFilter {
        self.compare(Comparison::Eq, value)
    }

    /// `self != value`
    pub fn ne(&self, value: impl Into<FilterValue>) -> HybridFilter {
        self.compare(Comparison::Ne, value)
    }
}

impl std::ops::Not for HybridExpression {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl std::ops::Not for &HybridExpression {
    type Output = HybridExpression;

    fn not(self) -> Self::Output {
        self.negate()
    }
}
