//! Query building, compilation, and execution.
//!
//! - [`lookups`] - Q objects and lookup types for filtering
//! - [`custom_lookups`] - Runtime registry of additional lookups
//! - [`expressions`] - F-objects, functions, and computed expressions
//! - [`compiler`] - Query AST and SQL compilation
//! - [`row`] - Result rows
//! - [`queryset`] - QuerySet and Manager for lazy query building

pub mod compiler;
pub mod custom_lookups;
pub mod expressions;
pub mod lookups;
pub mod queryset;
pub mod row;

pub use compiler::{DatabaseBackendType, OrderBy, Query, SelectColumn, SqlCompiler, WhereNode};
pub use expressions::{AggregateFunc, Expression, When};
pub use lookups::{Lookup, Q};
pub use queryset::{Manager, QuerySet};
pub use row::{FromValue, Row};
