//! Field definitions and types.
//!
//! [`FieldDef`] and [`FieldType`] describe model fields, their column
//! mappings, and the foreign keys that relation paths traverse.

pub mod types;

pub use types::{FieldDef, FieldType, OnDelete, RelatedMeta};
