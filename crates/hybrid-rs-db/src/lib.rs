//! # hybrid-rs-db
//!
//! The query layer hybrid attributes are built on. Provides the
//! [`Model`](model::Model) trait, [`QuerySet`](query::QuerySet) and
//! [`Manager`](query::Manager) for lazy query building, the
//! [`Expression`](query::Expression) AST, and the [`SqlCompiler`](query::SqlCompiler)
//! that turns it all into parameterized SQL.
//!
//! ## Architecture
//!
//! A [`QuerySet`](query::QuerySet) builds a [`Query`](query::Query) AST through
//! method chaining without touching the database. SQL is only generated when
//! a terminal method (`fetch_rows`, `execute_query`, `count_exec`, ...) runs
//! against a [`DbExecutor`](executor::DbExecutor). During compilation, field
//! paths like `classroom__teacher__first_name` become joins and references to
//! annotation aliases are inlined.
//!
//! ## Module Overview
//!
//! - [`model`] - The [`Model`](model::Model) trait and [`ModelMeta`](model::ModelMeta)
//! - [`fields`] - Field definitions ([`FieldDef`](fields::FieldDef)) and types
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum
//! - [`query`] - Query building, lookups, expressions, and compilation
//! - [`executor`] - The async [`DbExecutor`](executor::DbExecutor) seam

// These clippy lints are intentionally allowed for the query crate:
// - too_many_lines: The SQL compiler methods are inherently large due to many match arms
// - cast_precision_loss: i64-to-f64 casts are acceptable for loose value comparison
// - result_large_err: HybridError is the crate-wide error type and should be used consistently
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - doc_markdown: backtick requirements for documentation items are too strict
// - needless_pass_by_value: some API signatures match Django's patterns
// - return_self_not_must_use: builder pattern methods are self-documenting
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::result_large_err)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
// literal_string_with_formatting_args: template strings using {column}/{value} are intentional
#![allow(clippy::literal_string_with_formatting_args)]

pub mod executor;
pub mod fields;
pub mod model;
pub mod query;
pub mod value;

pub use executor::{create_model, DbExecutor};
pub use fields::{FieldDef, FieldType, OnDelete};
pub use model::{Model, ModelMeta, ReverseRelation};
pub use query::custom_lookups::{register_lookup, CustomLookup, LookupRegistry};
pub use query::{
    AggregateFunc, DatabaseBackendType, Expression, FromValue, Lookup, Manager, OrderBy, Query,
    QuerySet, Row, SelectColumn, SqlCompiler, When, WhereNode, Q,
};
pub use value::Value;
