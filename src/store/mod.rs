//! Entity persistence over the SQLite pool. Records cross this boundary as
//! JSON objects with camelCase keys; the per-entity schema tables translate
//! to and from the snake_case storage columns.

mod settings;

pub use settings::CompanySettings;

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::debug;

use crate::error::AppError;
use crate::id::new_uuid_v7;
use crate::schema::{Entity, FieldDef, FieldKind};
use crate::time::now_iso;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key in {entity}: {detail}")]
    DuplicateKey {
        entity: &'static str,
        detail: String,
    },
    #[error("dangling reference in {entity}: {detail}")]
    ForeignKeyViolation {
        entity: &'static str,
        detail: String,
    },
    #[error("{entity} record not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} record is missing required field {field}")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    #[error("invalid settings payload: {0}")]
    InvalidSettings(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        let code = match &error {
            StoreError::DuplicateKey { .. } => "STORE/DUPLICATE_KEY",
            StoreError::ForeignKeyViolation { .. } => "STORE/FOREIGN_KEY",
            StoreError::NotFound { .. } => "STORE/NOT_FOUND",
            StoreError::MissingField { .. } => "STORE/MISSING_FIELD",
            StoreError::InvalidSettings(_) => "STORE/INVALID_SETTINGS",
            StoreError::Database(_) => "STORE/DATABASE",
        };
        AppError::new(code, error.to_string())
    }
}

/// Map a sqlx failure onto the typed constraint taxonomy. Classification is
/// by the driver's reported constraint kind, never by message text.
fn classify(entity: Entity, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                return StoreError::DuplicateKey {
                    entity: entity.table(),
                    detail: db.message().to_string(),
                }
            }
            sqlx::error::ErrorKind::ForeignKeyViolation => {
                return StoreError::ForeignKeyViolation {
                    entity: entity.table(),
                    detail: db.message().to_string(),
                }
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a record. A missing `id` is generated; `createdAt` defaults to
    /// now and `updatedAt` is always refreshed. Returns the stored record as
    /// read back from the database.
    pub async fn create(
        &self,
        entity: Entity,
        mut data: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let schema = entity.schema();

        let id = data
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(new_uuid_v7);
        data.insert("id".into(), Value::String(id.clone()));
        let now = now_iso();
        if !matches!(data.get("createdAt"), Some(Value::String(_))) {
            data.insert("createdAt".into(), Value::String(now.clone()));
        }
        data.insert("updatedAt".into(), Value::String(now));

        for def in schema.fields {
            if def.required && !data.contains_key(def.api) {
                return Err(StoreError::MissingField {
                    entity: entity.table(),
                    field: def.api,
                });
            }
        }
        log_unknown_fields(entity, &data);

        let mut columns: Vec<&'static str> = Vec::new();
        let mut bound: Vec<(&FieldDef, &Value)> = Vec::new();
        for def in schema.fields {
            if let Some(value) = data.get(def.api) {
                columns.push(def.column);
                bound.push((def, value));
            }
        }

        let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            entity.table(),
            columns.join(", "),
            placeholders.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for (def, value) in &bound {
            query = bind_value(query, def, value);
        }
        query
            .execute(&self.pool)
            .await
            .map_err(|err| classify(entity, err))?;

        self.get_by_id(entity, &id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: entity.table(),
                id,
            })
    }

    pub async fn get_by_id(&self, entity: Entity, id: &str) -> Result<Option<Value>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", entity.table());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| classify(entity, err))?;
        Ok(row.map(|row| row_to_record(entity, &row)))
    }

    /// All records in stable insertion order.
    pub async fn list(&self, entity: Entity) -> Result<Vec<Value>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY created_at, id",
            entity.table()
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| classify(entity, err))?;
        Ok(rows.iter().map(|row| row_to_record(entity, row)).collect())
    }

    /// Apply a partial update. `id` and `createdAt` are immutable;
    /// `updatedAt` is always refreshed.
    pub async fn update(
        &self,
        entity: Entity,
        id: &str,
        mut patch: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let schema = entity.schema();
        patch.remove("id");
        patch.remove("createdAt");
        patch.insert("updatedAt".into(), Value::String(now_iso()));
        log_unknown_fields(entity, &patch);

        let mut assignments: Vec<String> = Vec::new();
        let mut bound: Vec<(&FieldDef, &Value)> = Vec::new();
        for def in schema.fields {
            if let Some(value) = patch.get(def.api) {
                assignments.push(format!("{} = ?", def.column));
                bound.push((def, value));
            }
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            entity.table(),
            assignments.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for (def, value) in &bound {
            query = bind_value(query, def, value);
        }
        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| classify(entity, err))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: entity.table(),
                id: id.to_string(),
            });
        }

        self.get_by_id(entity, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: entity.table(),
                id: id.to_string(),
            })
    }

    /// Returns whether a record was removed.
    pub async fn delete(&self, entity: Entity, id: &str) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", entity.table());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| classify(entity, err))?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every record of the collection. Used by the restore path.
    pub async fn clear(&self, entity: Entity) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {}", entity.table());
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|err| classify(entity, err))?;
        Ok(())
    }

    pub async fn count(&self, entity: Entity) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", entity.table());
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| classify(entity, err))?;
        Ok(count)
    }
}

fn log_unknown_fields(entity: Entity, data: &Map<String, Value>) {
    let schema = entity.schema();
    for key in data.keys() {
        if schema.field(key).is_none() {
            debug!(
                target: "shoplite",
                event = "ignored_unknown_field",
                entity = %entity,
                field = %key
            );
        }
    }
}

fn row_to_record(entity: Entity, row: &SqliteRow) -> Value {
    let mut map = Map::new();
    for def in entity.schema().fields {
        let value = match def.kind {
            FieldKind::Text => row
                .try_get::<Option<String>, _>(def.column)
                .ok()
                .flatten()
                .map(Value::from),
            FieldKind::Real => row
                .try_get::<Option<f64>, _>(def.column)
                .ok()
                .flatten()
                .map(Value::from),
            FieldKind::Integer => row
                .try_get::<Option<i64>, _>(def.column)
                .ok()
                .flatten()
                .map(Value::from),
            FieldKind::Bool => row
                .try_get::<Option<i64>, _>(def.column)
                .ok()
                .flatten()
                .map(|v| Value::Bool(v != 0)),
            FieldKind::Json => row
                .try_get::<Option<String>, _>(def.column)
                .ok()
                .flatten()
                .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::Null)),
        };
        map.insert(def.api.to_string(), value.unwrap_or(Value::Null));
    }
    Value::Object(map)
}

fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    def: &FieldDef,
    v: &Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    if v.is_null() {
        return q.bind(Option::<String>::None);
    }
    match def.kind {
        FieldKind::Text => match v {
            Value::String(s) => q.bind(s.clone()),
            other => q.bind(other.to_string()),
        },
        FieldKind::Real => q.bind(v.as_f64()),
        FieldKind::Integer => q.bind(v.as_i64()),
        FieldKind::Bool => match v {
            Value::Bool(b) => q.bind(*b as i64),
            other => q.bind(other.as_i64()),
        },
        // Accept either structured JSON or an already-serialized string.
        FieldKind::Json => match v {
            Value::String(s) => q.bind(s.clone()),
            other => q.bind(other.to_string()),
        },
    }
}
