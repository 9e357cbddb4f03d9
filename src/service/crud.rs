//! Generic CRUD execution against PostgreSQL.

use crate::config::TableDef;
use crate::error::AppError;
use crate::sql::{delete, insert, select_by_id, select_list, update, QueryBuf};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::PgPool;

pub struct CrudService;

impl CrudService {
    /// All rows matching every filter (exact match), ordered by primary key.
    pub async fn list(
        pool: &PgPool,
        table: &TableDef,
        filters: &[(String, Value)],
    ) -> Result<Vec<Value>, AppError> {
        let q = select_list(table, filters);
        Self::fetch_all(pool, &q).await
    }

    /// Fetch one row by primary key. Returns JSON object or None.
    pub async fn read(pool: &PgPool, table: &TableDef, id: &Value) -> Result<Option<Value>, AppError> {
        let q = select_by_id(table, id);
        Self::fetch_optional(pool, &q).await
    }

    /// Insert one row and return it as stored (defaults and identity filled in).
    pub async fn create(
        pool: &PgPool,
        table: &TableDef,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let q = insert(table, body);
        Self::fetch_optional(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update one row by id. Returns updated row, None when no row has that id.
    pub async fn update(
        pool: &PgPool,
        table: &TableDef,
        id: &Value,
        body: &Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = update(table, id, body);
        Self::fetch_optional(pool, &q).await
    }

    /// Delete one row by id. Returns deleted row or None.
    pub async fn delete(pool: &PgPool, table: &TableDef, id: &Value) -> Result<Option<Value>, AppError> {
        let q = delete(table, id);
        Self::fetch_optional(pool, &q).await
    }

    async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let row = query.fetch_optional(pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row, TypeInfo};
    let mut map = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let v = cell_to_value(row, idx, col.type_info().name());
        map.insert(col.name().to_string(), v);
    }
    Value::Object(map)
}

/// Decode by the column's PostgreSQL type name; anything unrecognized is tried as text.
fn cell_to_value(row: &PgRow, idx: usize, type_name: &str) -> Value {
    use sqlx::Row;
    fn get<'r, T>(row: &'r PgRow, idx: usize) -> Option<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<Option<T>, _>(idx).ok().flatten()
    }
    let v = match type_name {
        "INT2" => get::<i16>(row, idx).map(Value::from),
        "INT4" => get::<i32>(row, idx).map(Value::from),
        "INT8" => get::<i64>(row, idx).map(Value::from),
        "FLOAT4" => get::<f32>(row, idx)
            .and_then(|n| serde_json::Number::from_f64(f64::from(n)))
            .map(Value::Number),
        "FLOAT8" => get::<f64>(row, idx)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "BOOL" => get::<bool>(row, idx).map(Value::Bool),
        "UUID" => get::<uuid::Uuid>(row, idx).map(|u| Value::String(u.to_string())),
        "DATE" => get::<chrono::NaiveDate>(row, idx)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "TIMESTAMP" => get::<chrono::NaiveDateTime>(row, idx)
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, idx)
            .map(|d| Value::String(d.to_rfc3339())),
        "JSON" | "JSONB" => get::<Value>(row, idx),
        _ => get::<String>(row, idx).map(Value::String),
    };
    v.unwrap_or(Value::Null)
}
