//! Create every registered table on startup. Idempotent: schemas and tables use IF NOT EXISTS;
//! existing tables are left untouched.

use crate::config::MetaRegistry;
use crate::error::AppError;
use crate::sql::{create_schema, create_table};
use sqlx::PgPool;
use std::collections::HashSet;

pub async fn create_all(pool: &PgPool, registry: &MetaRegistry) -> Result<(), AppError> {
    let mut schemas = HashSet::new();
    for table in registry.tables() {
        let schema = table.schema_name();
        if schema != "public" && schemas.insert(schema.to_string()) {
            let sql = create_schema(schema);
            tracing::debug!(sql = %sql, "ddl");
            sqlx::query(&sql).execute(pool).await?;
        }
        let sql = create_table(table);
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(tables = registry.len(), "schema objects ensured");
    Ok(())
}
