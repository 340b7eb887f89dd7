//! Query expressions and database functions.
//!
//! - [`core`] - The [`Expression`] AST: F, Value, Func, Aggregate, Case/When, Cast, arithmetic
//! - [`functions`] - Database functions (Coalesce, Concat, Lower, Round, Cast, ...)

pub mod core;
pub mod functions;

pub use self::core::{AggregateFunc, Expression, When};
pub use self::functions::*;
