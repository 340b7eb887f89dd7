//! Query expressions and F-objects.
//!
//! [`Expression`] is the substrate's expression AST: column and field
//! references, literals, function calls, CASE/WHEN, and arithmetic. Hybrid
//! attribute bodies return one of these; the compiler turns it into SQL.
//!
//! # Examples
//!
//! ```
//! use hybrid_rs_db::query::expressions::{Expression, AggregateFunc};
//!
//! // F("magic_number1") + F("magic_number2")
//! let sum = Expression::f("magic_number1") + Expression::f("magic_number2");
//!
//! // F("grade") / 10.0
//! let percent = Expression::f("grade") / Expression::value(10.0);
//!
//! // Count("id")
//! let count = Expression::aggregate(AggregateFunc::Count, Expression::col("id"));
//! ```

use crate::query::lookups::Q;
use crate::value::Value;
use std::ops;

/// A query expression that produces a value in the context of a SQL query.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A raw, already-qualified column reference.
    Col(String),
    /// A literal value, bound as a query parameter.
    Value(Value),
    /// A reference to a model field, a relation path (`parent__name`), or an
    /// annotation alias on the same query.
    F(String),
    /// A database function call.
    Func {
        /// Function name (e.g., "CONCAT", "LOWER").
        name: String,
        /// Function arguments.
        args: Vec<Expression>,
    },
    /// An aggregate function.
    Aggregate {
        /// The aggregate operation.
        func: AggregateFunc,
        /// The expression being aggregated.
        field: Box<Expression>,
        /// Whether to apply DISTINCT.
        distinct: bool,
    },
    /// A CASE ... WHEN ... THEN ... ELSE ... END expression.
    Case {
        /// The WHEN/THEN branches.
        whens: Vec<When>,
        /// The ELSE value.
        default: Option<Box<Expression>>,
    },
    /// CAST(expr AS type), Django's `ExpressionWrapper(output_field=...)`.
    Cast {
        /// The expression to cast.
        expr: Box<Expression>,
        /// The target data type.
        data_type: String,
    },
    /// Addition.
    Add(Box<Expression>, Box<Expression>),
    /// Subtraction.
    Sub(Box<Expression>, Box<Expression>),
    /// Multiplication.
    Mul(Box<Expression>, Box<Expression>),
    /// Division.
    Div(Box<Expression>, Box<Expression>),
}

/// Aggregate function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    /// COUNT.
    Count,
    /// SUM.
    Sum,
    /// AVG.
    Avg,
    /// MIN.
    Min,
    /// MAX.
    Max,
}

impl AggregateFunc {
    /// Returns the SQL function name for this aggregate.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

/// A single WHEN/THEN branch in a CASE expression.
#[derive(Debug, Clone, PartialEq)]
pub struct When {
    /// The condition for this branch.
    pub condition: Q,
    /// The value to return when the condition is met.
    pub then: Expression,
}

impl When {
    /// Creates a WHEN branch.
    pub fn new(condition: Q, then: impl Into<Expression>) -> Self {
        Self {
            condition,
            then: then.into(),
        }
    }
}

impl Expression {
    /// Creates a raw column reference expression.
    pub fn col(name: impl Into<String>) -> Self {
        Self::Col(name.into())
    }

    /// Creates an F-expression referencing a field, relation path, or annotation.
    pub fn f(name: impl Into<String>) -> Self {
        Self::F(name.into())
    }

    /// Creates a literal value expression.
    pub fn value(v: impl Into<Value>) -> Self {
        Self::Value(v.into())
    }

    /// Creates a function call expression.
    pub fn func(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self::Func {
            name: name.into(),
            args,
        }
    }

    /// Creates an aggregate expression.
    pub fn aggregate(func: AggregateFunc, field: Expression) -> Self {
        Self::Aggregate {
            func,
            field: Box::new(field),
            distinct: false,
        }
    }

    /// Creates a CASE expression.
    pub fn case(whens: Vec<When>, default: Option<Expression>) -> Self {
        Self::Case {
            whens,
            default: default.map(Box::new),
        }
    }

    /// Wraps an expression in a CAST to the given SQL type.
    pub fn cast(expr: Expression, data_type: impl Into<String>) -> Self {
        Self::Cast {
            expr: Box::new(expr),
            data_type: data_type.into(),
        }
    }

    /// Returns the literal value if this is a [`Expression::Value`].
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for Expression {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl ops::Add for Expression {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::Add(Box::new(self), Box::new(rhs))
    }
}

impl ops::Sub for Expression {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::Sub(Box::new(self), Box::new(rhs))
    }
}

impl ops::Mul for Expression {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self::Mul(Box::new(self), Box::new(rhs))
    }
}

impl ops::Div for Expression {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        Self::Div(Box::new(self), Box::new(rhs))
    }
}
