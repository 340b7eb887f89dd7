//! # hybrid-rs-attributes
//!
//! Hybrid properties and methods: model attributes defined once and used
//! both on loaded instances and inside database queries.
//!
//! Accessed on an instance, a hybrid attribute runs its Rust body. Accessed
//! on the model type it yields a [`HybridExpression`], and comparing that
//! expression against a value yields a [`HybridFilter`] which a queryset
//! applies by annotating the expression under an alias and filtering on it.
//!
//! ## Modules
//!
//! - [`descriptor`] - [`HybridProperty`], [`HybridMethod`] and access contexts
//! - [`expression`] - [`HybridExpression`], comparisons and lookup configuration
//! - [`filter`] - [`HybridFilter`], a comparison ready to apply to a queryset
//! - [`alias`] - Annotation alias generation
//! - [`queryset`] - Hybrid-aware `filter` on querysets and managers
//! - [`consistency`] - Checking instance bodies against query expressions
//!
//! ## Example
//!
//! ```
//! use hybrid_rs_attributes::{HybridProperty, HybridQuerySetExt};
//! use hybrid_rs_db::{DatabaseBackendType, Expression, Q};
//! # use hybrid_rs_db::{FieldDef, FieldType, Model, ModelMeta, Row, Value};
//! # use hybrid_rs_core::HybridError;
//! # use std::sync::LazyLock;
//! # struct Student { magic_number1: i64, magic_number2: i64 }
//! # impl Model for Student {
//! #     fn meta() -> &'static ModelMeta {
//! #         static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta::new("school", "student", vec![
//! #             FieldDef::new("id", FieldType::BigAutoField).primary_key(),
//! #             FieldDef::new("magic_number1", FieldType::IntegerField),
//! #             FieldDef::new("magic_number2", FieldType::IntegerField),
//! #         ]));
//! #         &META
//! #     }
//! #     fn pk(&self) -> Option<&Value> { None }
//! #     fn field_values(&self) -> Vec<(&'static str, Value)> { Vec::new() }
//! #     fn from_row(row: &Row) -> Result<Self, HybridError> {
//! #         Ok(Self { magic_number1: row.get("magic_number1")?, magic_number2: row.get("magic_number2")? })
//! #     }
//! # }
//!
//! let magic_number_sum = HybridProperty::new("magic_number_sum", |s: &Student| {
//!     s.magic_number1 + s.magic_number2
//! })
//! .expression(|through: &str| {
//!     Expression::f(format!("{through}magic_number1"))
//!         + Expression::f(format!("{through}magic_number2"))
//! });
//!
//! let student = Student { magic_number1: 1, magic_number2: 2 };
//! assert_eq!(magic_number_sum.value(&student), 3);
//!
//! let qs = Student::objects()
//!     .all()
//!     .hybrid_filter([magic_number_sum.expr()?.with_alias("_sum").lte(5)])?;
//! let (sql, _) = qs.to_sql(DatabaseBackendType::SQLite)?;
//! assert!(sql.contains("AS \"_sum\""));
//! # Ok::<(), HybridError>(())
//! ```

// These clippy lints are intentionally allowed for the attributes crate:
// - should_implement_trait: `eq`/`ne`/`lt`... build filters, they do not compare
// - result_large_err: HybridError is the crate-wide error type and should be used consistently
// - missing_const_for_fn: builder methods clone non-const fields
#![allow(clippy::should_implement_trait)]
#![allow(clippy::result_large_err)]
#![allow(clippy::missing_const_for_fn)]

pub mod alias;
pub mod consistency;
pub mod descriptor;
pub mod expression;
pub mod filter;
pub mod queryset;

pub use alias::{AliasSource, RandomAliases, SequentialAliases};
pub use consistency::{
    assert_hybrid_attributes_are_consistent, assert_hybrid_attributes_are_consistent_in,
    ConsistencyCheck, RESULT_ALIAS,
};
pub use descriptor::{
    Access, BoundHybridMethod, HybridAttribute, HybridMethod, HybridProperty, Resolved,
};
pub use expression::{Comparison, ExpressionProducer, FilterValue, HybridExpression, Polarity};
pub use filter::HybridFilter;
pub use queryset::{FilterArg, HybridManager, HybridQuerySetExt};
