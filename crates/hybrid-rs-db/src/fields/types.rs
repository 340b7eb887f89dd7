//! Field type definitions.
//!
//! Each [`FieldType`] variant corresponds to a column kind; [`FieldDef`]
//! captures the metadata the query compiler needs about a single field,
//! most importantly how foreign keys resolve into joins.

use crate::model::ModelMeta;
use crate::value::Value;

/// Returns the metadata of the model a foreign key points at.
///
/// Implementations of [`Model::meta`](crate::model::Model::meta) coerce to
/// this type, so a relation is declared as `to: Teacher::meta`.
pub type RelatedMeta = fn() -> &'static ModelMeta;

/// The type of a model field, determining its SQL column type and behavior.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// Auto-incrementing 64-bit integer primary key.
    BigAutoField,
    /// Variable-length string with a max length.
    CharField,
    /// Unlimited-length text.
    TextField,
    /// 64-bit signed integer.
    IntegerField,
    /// Non-negative small integer.
    PositiveSmallIntegerField,
    /// 64-bit floating-point number.
    FloatField,
    /// Boolean (true/false).
    BooleanField,
    /// Date without time.
    DateField,
    /// Date and time.
    DateTimeField,
    /// JSON data.
    JsonField,
    /// Many-to-one relationship. The column stores the target's primary key.
    ForeignKey {
        /// The target model.
        to: RelatedMeta,
        /// Behavior when the referenced object is deleted.
        on_delete: OnDelete,
    },
}

/// Behavior when a referenced object is deleted (ON DELETE action).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete all related objects (CASCADE).
    Cascade,
    /// Prevent deletion if related objects exist (RESTRICT).
    Protect,
    /// Set the foreign key to NULL.
    SetNull,
}

impl OnDelete {
    /// Returns the SQL `ON DELETE` action.
    pub const fn sql_action(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Protect => "RESTRICT",
            Self::SetNull => "SET NULL",
        }
    }
}

/// Complete definition of a model field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The attribute name of this field, used in lookups and F references.
    pub name: &'static str,
    /// The database column name (`<name>_id` for foreign keys).
    pub column: String,
    /// The type of this field.
    pub field_type: FieldType,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether NULL is allowed in the database.
    pub null: bool,
    /// Default value for new rows.
    pub default: Option<Value>,
    /// Maximum character length (for CharField).
    pub max_length: Option<usize>,
}

impl FieldDef {
    /// Creates a new non-null `FieldDef` whose column equals its name.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            column: name.to_string(),
            field_type,
            primary_key: false,
            null: false,
            default: None,
            max_length: None,
        }
    }

    /// Creates a foreign key field stored in the `<name>_id` column.
    pub fn foreign_key(name: &'static str, to: RelatedMeta, on_delete: OnDelete) -> Self {
        Self {
            column: format!("{name}_id"),
            ..Self::new(name, FieldType::ForeignKey { to, on_delete })
        }
    }

    /// Sets the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows NULL values in the database.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Sets the maximum character length.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets the default value for this field.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns the target model of a foreign key, or `None` for plain fields.
    pub fn related_meta(&self) -> Option<&'static ModelMeta> {
        match self.field_type {
            FieldType::ForeignKey { to, .. } => Some(to()),
            _ => None,
        }
    }

    /// Returns `true` if this field is a relation.
    pub const fn is_relation(&self) -> bool {
        matches!(self.field_type, FieldType::ForeignKey { .. })
    }

    /// Returns the column definition used in `CREATE TABLE` on SQLite.
    pub fn sqlite_column_def(&self) -> String {
        let mut def = format!("\"{}\" {}", self.column, self.field_type.sqlite_column_type());
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
            if matches!(self.field_type, FieldType::BigAutoField) {
                def.push_str(" AUTOINCREMENT");
            }
        } else if !self.null {
            def.push_str(" NOT NULL");
        }
        if let FieldType::ForeignKey { to, on_delete } = &self.field_type {
            let target = to();
            def.push_str(&format!(
                " REFERENCES \"{}\" (\"{}\") ON DELETE {}",
                target.db_table,
                target.pk_column(),
                on_delete.sql_action()
            ));
        }
        def
    }
}

impl FieldType {
    /// Returns the SQLite column type affinity for this field type.
    pub const fn sqlite_column_type(&self) -> &'static str {
        match self {
            Self::BigAutoField
            | Self::IntegerField
            | Self::PositiveSmallIntegerField
            | Self::BooleanField
            | Self::ForeignKey { .. } => "INTEGER",
            Self::CharField | Self::TextField | Self::DateField | Self::DateTimeField => "TEXT",
            Self::FloatField => "REAL",
            Self::JsonField => "JSON",
        }
    }
}
