//! Query lookups and Q objects for building complex filters.
//!
//! [`Lookup`] is a field-level comparison whose right-hand side is an
//! [`Expression`]: usually a literal, but an `F` reference to a field or to
//! another annotation on the same query is equally valid. [`Q`] combines
//! lookups with AND, OR, and NOT.
//!
//! # Examples
//!
//! ```
//! use hybrid_rs_db::query::lookups::{Q, Lookup};
//! use hybrid_rs_db::query::expressions::Expression;
//!
//! // first_name = "Ada"
//! let q = Q::kwarg("first_name", "Ada");
//!
//! // first_name = "Ada" AND magic_number1 > 25
//! let combined = q & Q::kwarg("magic_number1__gt", 25);
//!
//! // alias_a = alias_b, comparing two annotations
//! let cmp = Q::filter("alias_a", Lookup::Exact(Expression::f("alias_b")));
//!
//! // NOT(active = false)
//! let negated = !Q::kwarg("active", false);
//! ```

use crate::query::custom_lookups::{self, CustomLookup};
use crate::query::expressions::Expression;
use crate::value::Value;
use hybrid_rs_core::{HybridError, HybridResult};
use std::ops;

/// Names of the built-in lookups, as they appear after `__` in a keyword.
pub const BUILTIN_LOOKUPS: &[&str] = &[
    "exact",
    "iexact",
    "contains",
    "icontains",
    "in",
    "gt",
    "gte",
    "lt",
    "lte",
    "startswith",
    "istartswith",
    "endswith",
    "iendswith",
    "range",
    "isnull",
    "regex",
    "iregex",
];

/// A field-level lookup operation.
///
/// Each variant corresponds to a Django lookup type and produces the
/// appropriate SQL WHERE clause fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Exact match (`field = value`).
    Exact(Expression),
    /// Case-insensitive exact match (`LOWER(field) = LOWER(value)`).
    IExact(Expression),
    /// Substring match (`field LIKE '%value%'`).
    Contains(Expression),
    /// Case-insensitive substring match.
    IContains(Expression),
    /// Membership test (`field IN (values...)`).
    In(Vec<Value>),
    /// Greater than (`field > value`).
    Gt(Expression),
    /// Greater than or equal (`field >= value`).
    Gte(Expression),
    /// Less than (`field < value`).
    Lt(Expression),
    /// Less than or equal (`field <= value`).
    Lte(Expression),
    /// Starts with (`field LIKE 'value%'`).
    StartsWith(Expression),
    /// Case-insensitive starts with.
    IStartsWith(Expression),
    /// Ends with (`field LIKE '%value'`).
    EndsWith(Expression),
    /// Case-insensitive ends with.
    IEndsWith(Expression),
    /// Range test (`field BETWEEN low AND high`).
    Range(Expression, Expression),
    /// NULL test (`field IS NULL` or `field IS NOT NULL`).
    IsNull(bool),
    /// Regular expression match.
    Regex(String),
    /// Case-insensitive regular expression match.
    IRegex(String),
    /// A lookup registered at runtime through
    /// [`register_lookup`](crate::query::custom_lookups::register_lookup).
    Custom {
        /// The registered lookup.
        lookup: CustomLookup,
        /// The right-hand side.
        operand: Expression,
    },
}

impl Lookup {
    /// Builds a lookup from its keyword name and a right-hand side.
    ///
    /// Built-in names are tried first, then the global custom lookup
    /// registry. `exact` and `iexact` against a NULL literal become
    /// `IS NULL`, as in Django.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::FieldError`] for an unknown lookup name or an
    /// operand that does not fit the lookup (`in` needs a list, `range` a
    /// two-element list, `isnull` a boolean, `regex` a string).
    pub fn from_name(name: &str, operand: Expression) -> HybridResult<Self> {
        let lookup = match name {
            "exact" => match operand {
                Expression::Value(Value::Null) => Self::IsNull(true),
                other => Self::Exact(other),
            },
            "iexact" => match operand {
                Expression::Value(Value::Null) => Self::IsNull(true),
                other => Self::IExact(other),
            },
            "contains" => Self::Contains(operand),
            "icontains" => Self::IContains(operand),
            "gt" => Self::Gt(operand),
            "gte" => Self::Gte(operand),
            "lt" => Self::Lt(operand),
            "lte" => Self::Lte(operand),
            "startswith" => Self::StartsWith(operand),
            "istartswith" => Self::IStartsWith(operand),
            "endswith" => Self::EndsWith(operand),
            "iendswith" => Self::IEndsWith(operand),
            "in" => match operand {
                Expression::Value(Value::List(values)) => Self::In(values),
                other => return Err(bad_operand(name, &other)),
            },
            "range" => match operand {
                Expression::Value(Value::List(values)) if values.len() == 2 => {
                    let mut values = values.into_iter();
                    match (values.next(), values.next()) {
                        (Some(low), Some(high)) => {
                            Self::Range(Expression::Value(low), Expression::Value(high))
                        }
                        _ => return Err(HybridError::FieldError("range needs two bounds".into())),
                    }
                }
                other => return Err(bad_operand(name, &other)),
            },
            "isnull" => match operand {
                Expression::Value(Value::Bool(b)) => Self::IsNull(b),
                other => return Err(bad_operand(name, &other)),
            },
            "regex" | "iregex" => match operand {
                Expression::Value(Value::String(pattern)) if name == "regex" => {
                    Self::Regex(pattern)
                }
                Expression::Value(Value::String(pattern)) => Self::IRegex(pattern),
                other => return Err(bad_operand(name, &other)),
            },
            _ => match custom_lookups::custom_lookup(name) {
                Some(lookup) => Self::Custom { lookup, operand },
                None => {
                    return Err(HybridError::FieldError(format!(
                        "Unsupported lookup '{name}'"
                    )))
                }
            },
        };
        Ok(lookup)
    }

    /// Returns `true` if `name` is a built-in or registered lookup.
    pub fn is_known(name: &str) -> bool {
        BUILTIN_LOOKUPS.contains(&name) || custom_lookups::custom_lookup(name).is_some()
    }
}

fn bad_operand(name: &str, operand: &Expression) -> HybridError {
    HybridError::FieldError(format!(
        "Lookup '{name}' does not accept the value {operand:?}"
    ))
}

/// A composable query filter, equivalent to Django's `Q` object.
///
/// `Q` objects can be combined using `&` (AND), `|` (OR), and `!` (NOT)
/// operators to build arbitrarily complex WHERE clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    /// A single field lookup.
    Filter {
        /// The field name, relation path (`parent__name`), or annotation alias.
        field: String,
        /// The lookup operation.
        lookup: Lookup,
    },
    /// Logical AND of multiple conditions.
    And(Vec<Q>),
    /// Logical OR of multiple conditions.
    Or(Vec<Q>),
    /// Logical negation of a condition.
    Not(Box<Q>),
}

impl Q {
    /// Creates a new filter Q object.
    pub fn filter(field: impl Into<String>, lookup: Lookup) -> Self {
        Self::Filter {
            field: field.into(),
            lookup,
        }
    }

    /// Creates a filter from a Django-style keyword such as `age__gt`.
    ///
    /// The trailing segment is used as the lookup when it names one;
    /// otherwise the whole keyword is the field path and the lookup is
    /// `exact`. Operand shape mismatches (say `in` with a scalar) fall back
    /// to matching the value exactly; use [`Q::try_kwarg`] to surface them.
    pub fn kwarg(key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::try_kwarg(key, Expression::Value(value.clone())).unwrap_or_else(|_| {
            let (field, _) = split_keyword(key);
            Self::filter(field, Lookup::Exact(Expression::Value(value)))
        })
    }

    /// Creates a filter from a keyword and an arbitrary right-hand side.
    ///
    /// # Errors
    ///
    /// Propagates [`Lookup::from_name`] errors.
    pub fn try_kwarg(key: &str, operand: Expression) -> HybridResult<Self> {
        let (field, lookup) = split_keyword(key);
        Ok(Self::filter(field, Lookup::from_name(lookup, operand)?))
    }

    /// Returns `true` if this is an empty AND (always true).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(children) | Self::Or(children) => children.is_empty(),
            _ => false,
        }
    }
}

/// Splits `field__path__lookup` into the field path and the lookup name.
pub fn split_keyword(key: &str) -> (&str, &str) {
    match key.rsplit_once("__") {
        Some((field, lookup)) if !field.is_empty() && Lookup::is_known(lookup) => (field, lookup),
        _ => (key, "exact"),
    }
}

impl ops::BitAnd for Q {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            // Flatten nested ANDs
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (other, Self::And(mut right)) => {
                right.insert(0, other);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }
}

impl ops::BitOr for Q {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), other) => {
                left.push(other);
                Self::Or(left)
            }
            (other, Self::Or(mut right)) => {
                right.insert(0, other);
                Self::Or(right)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }
}

impl ops::Not for Q {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}
