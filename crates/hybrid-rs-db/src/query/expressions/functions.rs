//! Database functions for expression bodies.
//!
//! Builder functions that create [`Expression`] values for the SQL functions
//! hybrid attribute bodies typically need, mirroring a subset of Django's
//! `django.db.models.functions`.
//!
//! # Examples
//!
//! ```
//! use hybrid_rs_db::query::expressions::functions::*;
//! use hybrid_rs_db::query::expressions::core::Expression;
//!
//! // Concat("first_name", Value(" "), "last_name")
//! let full_name = concat(vec![
//!     Expression::f("first_name"),
//!     Expression::value(" "),
//!     Expression::f("last_name"),
//! ]);
//!
//! // ROUND(grade / 10.0, 1)
//! let rounded = round(Expression::f("grade") / Expression::value(10.0), Some(1));
//! ```

use super::core::Expression;

/// `COALESCE(a, b, ...)`: the first non-NULL argument.
pub fn coalesce(args: Vec<Expression>) -> Expression {
    Expression::func("COALESCE", args)
}

/// `NULLIF(a, b)`: NULL when both arguments are equal.
pub fn nullif(expr1: Expression, expr2: Expression) -> Expression {
    Expression::func("NULLIF", vec![expr1, expr2])
}

/// String concatenation. NULL arguments are treated as empty strings on
/// every backend.
pub fn concat(args: Vec<Expression>) -> Expression {
    Expression::func("CONCAT", args)
}

/// Character length of a string.
pub fn length(expr: Expression) -> Expression {
    Expression::func("LENGTH", vec![expr])
}

/// `LOWER(expr)`.
pub fn lower(expr: Expression) -> Expression {
    Expression::func("LOWER", vec![expr])
}

/// `UPPER(expr)`.
pub fn upper(expr: Expression) -> Expression {
    Expression::func("UPPER", vec![expr])
}

/// `TRIM(expr)`.
pub fn trim(expr: Expression) -> Expression {
    Expression::func("TRIM", vec![expr])
}

/// `SUBSTR(expr, pos[, len])`, 1-based like SQL.
pub fn substr(expr: Expression, pos: Expression, len: Option<Expression>) -> Expression {
    let mut args = vec![expr, pos];
    args.extend(len);
    Expression::func("SUBSTR", args)
}

/// `ABS(expr)`.
pub fn abs(expr: Expression) -> Expression {
    Expression::func("ABS", vec![expr])
}

/// `ROUND(expr[, digits])`.
pub fn round(expr: Expression, digits: Option<i32>) -> Expression {
    let mut args = vec![expr];
    if let Some(d) = digits {
        args.push(Expression::value(d));
    }
    Expression::func("ROUND", args)
}

/// Remainder of integer division.
pub fn modulo(dividend: Expression, divisor: Expression) -> Expression {
    Expression::func("MOD", vec![dividend, divisor])
}

/// `CAST(expr AS data_type)`.
pub fn cast(expr: Expression, data_type: impl Into<String>) -> Expression {
    Expression::cast(expr, data_type)
}
