//! Database executor trait and model insertion.
//!
//! [`DbExecutor`] is the minimal async interface that
//! [`QuerySet`](crate::query::queryset::QuerySet) execution needs. Backends in
//! the `hybrid-rs-db-backends` crate implement it; keeping the trait here
//! lets query execution be defined without a circular dependency.

use crate::model::Model;
use crate::query::compiler::{DatabaseBackendType, SqlCompiler};
use crate::query::row::Row;
use crate::value::Value;
use hybrid_rs_core::{HybridError, HybridResult};

/// Minimal async database executor trait.
#[async_trait::async_trait]
pub trait DbExecutor: Send + Sync {
    /// Returns the backend type for SQL compilation.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Runs a SQL statement that does not return rows.
    /// Returns the number of rows affected.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> HybridResult<u64>;

    /// Runs a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> HybridResult<Vec<Row>>;

    /// Executes an INSERT and returns the new row's primary key.
    ///
    /// The default issues `last_insert_rowid()`, which is only correct on
    /// SQLite; other backends override it.
    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> HybridResult<Value> {
        self.execute_sql(sql, params).await?;
        let rows = self.query("SELECT last_insert_rowid() AS id", &[]).await?;
        match rows.into_iter().next() {
            Some(row) => row.get::<Value>("id"),
            None => Err(HybridError::DatabaseError(
                "Failed to retrieve last inserted ID".to_string(),
            )),
        }
    }
}

/// Inserts a model instance and returns its primary key.
///
/// An already-set primary key is written as-is; otherwise the database
/// assigns one.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn create_model<M: Model>(model: &M, db: &dyn DbExecutor) -> HybridResult<Value> {
    let meta = M::meta();
    let mut fields = model.field_values();
    if let Some(pk) = model.pk() {
        let pk_column: &'static str = meta.pk_field().map_or("id", |f| f.name);
        fields.insert(0, (pk_column, pk.clone()));
    }
    let columns: Vec<(&str, Value)> = fields
        .iter()
        .map(|(name, value)| {
            let column = meta.field(name).map_or(*name, |f| f.column.as_str());
            (column, value.clone())
        })
        .collect();
    let (sql, params) = SqlCompiler::new(db.backend_type()).compile_insert(&meta.db_table, &columns);
    tracing::debug!(table = %meta.db_table, sql = %sql, "inserting row");
    let id = db.insert_returning_id(&sql, &params).await?;
    Ok(model.pk().cloned().unwrap_or(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldDef, FieldType, OnDelete};
    use crate::model::ModelMeta;
    use std::sync::{LazyLock, Mutex};

    struct Recorder {
        statements: Mutex<Vec<(String, Vec<Value>)>>,
    }

    #[async_trait::async_trait]
    impl DbExecutor for Recorder {
        fn backend_type(&self) -> DatabaseBackendType {
            DatabaseBackendType::SQLite
        }

        async fn execute_sql(&self, sql: &str, params: &[Value]) -> HybridResult<u64> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(1)
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> HybridResult<Vec<Row>> {
            Ok(vec![Row::new(vec!["id".into()], vec![Value::Int(7)])])
        }
    }

    fn owner_meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> =
            LazyLock::new(|| ModelMeta::new("t", "owner", vec![FieldDef::new("id", FieldType::BigAutoField).primary_key()]));
        &META
    }

    struct Pet {
        id: Value,
        name: String,
        owner_id: i64,
    }

    impl Model for Pet {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::new(
                    "t",
                    "pet",
                    vec![
                        FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                        FieldDef::new("name", FieldType::CharField),
                        FieldDef::foreign_key("owner", owner_meta, OnDelete::Cascade),
                    ],
                )
            });
            &META
        }

        fn pk(&self) -> Option<&Value> {
            (!self.id.is_null()).then_some(&self.id)
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("name", Value::from(self.name.as_str())),
                ("owner", Value::from(self.owner_id)),
            ]
        }

        fn from_row(row: &Row) -> Result<Self, HybridError> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
                owner_id: row.get("owner_id")?,
            })
        }
    }

    #[tokio::test]
    async fn test_create_model_maps_fk_columns() {
        let db = Recorder {
            statements: Mutex::new(Vec::new()),
        };
        let pet = Pet {
            id: Value::Null,
            name: "Rex".into(),
            owner_id: 3,
        };
        let id = create_model(&pet, &db).await.unwrap();
        assert_eq!(id, Value::Int(7));
        let statements = db.statements.lock().unwrap();
        assert_eq!(
            statements[0].0,
            "INSERT INTO \"t_pet\" (\"name\", \"owner_id\") VALUES (?, ?)"
        );
    }

    #[tokio::test]
    async fn test_create_model_keeps_explicit_pk() {
        let db = Recorder {
            statements: Mutex::new(Vec::new()),
        };
        let pet = Pet {
            id: Value::Int(42),
            name: "Rex".into(),
            owner_id: 3,
        };
        assert_eq!(create_model(&pet, &db).await.unwrap(), Value::Int(42));
        let statements = db.statements.lock().unwrap();
        assert!(statements[0].0.starts_with("INSERT INTO \"t_pet\" (\"id\", \"name\""));
    }
}
