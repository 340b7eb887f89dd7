//! Model trait and metadata.
//!
//! The [`Model`] trait is implemented by every struct that maps to a table.
//! [`ModelMeta`] describes the table: its name, fields, and relations. The
//! query compiler reads relations from it to turn `parent__name` style paths
//! into joins. Foreign keys are followed forward from the model that
//! declares them, and backward through a [`ReverseRelation`] declared on
//! the referenced model.

use crate::fields::{FieldDef, RelatedMeta};
use crate::query::compiler::OrderBy;
use crate::query::queryset::Manager;
use crate::value::Value;
use hybrid_rs_core::HybridError;

pub use crate::query::row::Row;

/// The core trait for all models.
///
/// # Examples
///
/// ```
/// use hybrid_rs_db::fields::{FieldDef, FieldType};
/// use hybrid_rs_db::model::{Model, ModelMeta, Row};
/// use hybrid_rs_db::value::Value;
/// use hybrid_rs_core::HybridError;
/// use std::sync::LazyLock;
///
/// struct Article {
///     id: Value,
///     title: String,
/// }
///
/// impl Model for Article {
///     fn meta() -> &'static ModelMeta {
///         static META: LazyLock<ModelMeta> = LazyLock::new(|| {
///             ModelMeta::new("blog", "article", vec![
///                 FieldDef::new("id", FieldType::BigAutoField).primary_key(),
///                 FieldDef::new("title", FieldType::CharField),
///             ])
///         });
///         &META
///     }
///
///     fn pk(&self) -> Option<&Value> {
///         (!self.id.is_null()).then_some(&self.id)
///     }
///
///     fn field_values(&self) -> Vec<(&'static str, Value)> {
///         vec![("title", Value::from(self.title.as_str()))]
///     }
///
///     fn from_row(row: &Row) -> Result<Self, HybridError> {
///         Ok(Article { id: row.get("id")?, title: row.get("title")? })
///     }
/// }
///
/// assert_eq!(Article::table_name(), "blog_article");
/// ```
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Returns the database table name.
    fn table_name() -> &'static str {
        &Self::meta().db_table
    }

    /// Returns a reference to the primary key value, or `None` if unsaved.
    fn pk(&self) -> Option<&Value>;

    /// Returns the non-primary-key column/value pairs used for INSERT.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Constructs a model instance from a database row.
    fn from_row(row: &Row) -> Result<Self, HybridError>
    where
        Self: Sized;

    /// Returns the default manager, equivalent to Django's `Model.objects`.
    fn objects() -> Manager<Self>
    where
        Self: Sized,
    {
        Manager::new()
    }
}

/// Metadata about a model, equivalent to Django's `class Meta`.
#[derive(Debug)]
pub struct ModelMeta {
    /// The application label (e.g., "school").
    pub app_label: &'static str,
    /// The model name in lowercase (e.g., "student").
    pub model_name: &'static str,
    /// The database table name.
    pub db_table: String,
    /// Default ordering for queries.
    pub ordering: Vec<OrderBy>,
    /// Field definitions for this model.
    pub fields: Vec<FieldDef>,
    /// Foreign keys on other models that point at this one, by the name
    /// queries use to follow them.
    pub reverse_relations: Vec<ReverseRelation>,
}

/// The reverse side of a foreign key, equivalent to Django's
/// `related_name` accessor.
///
/// Following it from a parent row yields every child row whose foreign
/// key references the parent, so a filter through it can match a parent
/// more than once.
#[derive(Debug, Clone, Copy)]
pub struct ReverseRelation {
    /// The path segment that follows the relation (e.g. `"enrolment"`).
    pub name: &'static str,
    /// The model declaring the foreign key.
    pub model: RelatedMeta,
    /// The foreign key field's name on that model.
    pub field: &'static str,
}

impl ReverseRelation {
    /// Returns the metadata of the model declaring the foreign key.
    pub fn related_meta(&self) -> &'static ModelMeta {
        (self.model)()
    }

    /// Returns the foreign key field on the related model, if it exists.
    pub fn foreign_key(&self) -> Option<&'static FieldDef> {
        self.related_meta()
            .field(self.field)
            .filter(|f| f.related_meta().is_some())
    }
}

impl ModelMeta {
    /// Creates metadata whose table is named `<app_label>_<model_name>`.
    pub fn new(app_label: &'static str, model_name: &'static str, fields: Vec<FieldDef>) -> Self {
        Self {
            app_label,
            model_name,
            db_table: format!("{app_label}_{model_name}"),
            ordering: Vec::new(),
            fields,
            reverse_relations: Vec::new(),
        }
    }

    /// Declares that `field` on `model` is a foreign key to this model,
    /// reachable from here as `name`.
    #[must_use]
    pub fn reverse_relation(mut self, name: &'static str, model: RelatedMeta, field: &'static str) -> Self {
        self.reverse_relations.push(ReverseRelation { name, model, field });
        self
    }

    /// Sets the default ordering.
    #[must_use]
    pub fn ordering(mut self, ordering: Vec<OrderBy>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Looks up a field by its attribute name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a reverse relation by name.
    pub fn reverse(&self, name: &str) -> Option<&ReverseRelation> {
        self.reverse_relations.iter().find(|r| r.name == name)
    }

    /// Returns the primary key field, if one is declared.
    pub fn pk_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Returns the primary key column, defaulting to `id`.
    pub fn pk_column(&self) -> &str {
        self.pk_field().map_or("id", |f| f.column.as_str())
    }

    /// Generates the `CREATE TABLE` statement for SQLite.
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.fields.iter().map(FieldDef::sqlite_column_def).collect();
        format!(
            "CREATE TABLE \"{}\" ({})",
            self.db_table,
            columns.join(", ")
        )
    }
}
