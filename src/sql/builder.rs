//! Builds parameterized INSERT, SELECT, UPDATE, DELETE and DDL from a table declaration.

use crate::config::{ColumnDef, TableDef};
use crate::sql::PgBindValue;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from declarations).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(table: &TableDef) -> String {
    format!("{}.{}", quoted(table.schema_name()), quoted(&table.name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Bind a value for `column` and return its cast placeholder (`$n::type`).
    fn push_param(&mut self, column: &ColumnDef, v: &Value) -> String {
        self.params.push(PgBindValue::for_column(&column.type_, v));
        format!("${}::{}", self.params.len(), column.type_.cast())
    }
}

fn select_column_list(table: &TableDef) -> String {
    table
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn pk_column(table: &TableDef) -> ColumnDef {
    table
        .primary_key()
        .cloned()
        .unwrap_or_else(|| ColumnDef::new(table.pk_name(), crate::config::ColumnType::Text))
}

/// SELECT by primary key.
pub fn select_by_id(table: &TableDef, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = pk_column(table);
    let ph = q.push_param(&pk, id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(table),
        qualified_table(table),
        quoted(&pk.name),
        ph
    );
    q
}

/// SELECT with exact-match filters ANDed together, ordered by primary key.
/// Filters naming columns not in the table are skipped; callers reject them earlier.
pub fn select_list(table: &TableDef, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in filters {
        let Some(c) = table.column_named(col) else { continue };
        if val.is_null() {
            where_parts.push(format!("{} IS NULL", quoted(col)));
            continue;
        }
        let ph = q.push_param(c, val);
        where_parts.push(format!("{} = {}", quoted(col), ph));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        select_column_list(table),
        qualified_table(table),
        where_clause,
        quoted(table.pk_name())
    );
    q
}

/// INSERT the columns present in `body`, in declaration order; the database fills the rest.
pub fn insert(table: &TableDef, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &table.columns {
        let Some(val) = body.get(&c.name) else { continue };
        placeholders.push(q.push_param(c, val));
        cols.push(quoted(&c.name));
    }
    let values = if cols.is_empty() {
        " DEFAULT VALUES".to_string()
    } else {
        format!(" ({}) VALUES ({})", cols.join(", "), placeholders.join(", "))
    };
    q.sql = format!(
        "INSERT INTO {}{} RETURNING {}",
        qualified_table(table),
        values,
        select_column_list(table)
    );
    q
}

/// UPDATE by id: SET only columns present in body. The primary key is never updated.
/// With nothing to set this degrades to a SELECT by id so the caller still gets the row.
pub fn update(table: &TableDef, id: &Value, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = pk_column(table);
    let mut sets = Vec::new();
    for c in &table.columns {
        if c.name == pk.name {
            continue;
        }
        let Some(val) = body.get(&c.name) else { continue };
        let rhs = q.push_param(c, val);
        sets.push(format!("{} = {}", quoted(&c.name), rhs));
    }
    if sets.is_empty() {
        return select_by_id(table, id);
    }
    let id_ph = q.push_param(&pk, id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        sets.join(", "),
        quoted(&pk.name),
        id_ph,
        select_column_list(table)
    );
    q
}

/// DELETE by id, returning the deleted row.
pub fn delete(table: &TableDef, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = pk_column(table);
    let ph = q.push_param(&pk, id);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        quoted(&pk.name),
        ph,
        select_column_list(table)
    );
    q
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))
}

/// Idempotent CREATE TABLE for a declaration: column types, NOT NULL, defaults, PK and UNIQUE.
pub fn create_table(table: &TableDef) -> String {
    let mut defs: Vec<String> = Vec::new();
    for c in &table.columns {
        let mut def = format!("{} {}", quoted(&c.name), c.type_.sql_type(c.autoincrement));
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(expr) = &c.default {
            def.push_str(" DEFAULT ");
            def.push_str(expr);
        }
        if c.unique {
            def.push_str(" UNIQUE");
        }
        defs.push(def);
    }
    defs.push(format!("PRIMARY KEY ({})", quoted(table.pk_name())));
    for group in &table.unique {
        let cols: Vec<String> = group.iter().map(|s| quoted(s)).collect();
        defs.push(format!("UNIQUE ({})", cols.join(", ")));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        qualified_table(table),
        defs.join(",\n  ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnDef, ColumnType};
    use serde_json::json;

    fn author() -> TableDef {
        TableDef::new("author")
            .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
            .column(ColumnDef::new("name", ColumnType::Text).not_null())
            .column(ColumnDef::new("alias", ColumnType::Text))
            .column(ColumnDef::new("birth_date", ColumnType::Date).not_null())
            .unique_together(&["name", "birth_date"])
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_binds_present_columns_in_declaration_order() {
        let q = insert(&author(), &body(json!({"birth_date": "2020-01-01", "name": "Patrick"})));
        assert_eq!(
            q.sql,
            "INSERT INTO \"public\".\"author\" (\"name\", \"birth_date\") VALUES ($1::text, $2::date) \
             RETURNING \"id\", \"name\", \"alias\", \"birth_date\""
        );
        assert_eq!(
            q.params,
            vec![
                PgBindValue::String("Patrick".into()),
                PgBindValue::String("2020-01-01".into())
            ]
        );
    }

    #[test]
    fn insert_without_values_uses_defaults() {
        let q = insert(&author(), &Map::new());
        assert!(q.sql.starts_with("INSERT INTO \"public\".\"author\" DEFAULT VALUES RETURNING"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn select_list_ands_filters_and_orders_by_pk() {
        let q = select_list(
            &author(),
            &[
                ("name".into(), json!("Patrick")),
                ("alias".into(), Value::Null),
                ("nope".into(), json!(1)),
            ],
        );
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"alias\", \"birth_date\" FROM \"public\".\"author\" \
             WHERE \"name\" = $1::text AND \"alias\" IS NULL ORDER BY \"id\""
        );
        assert_eq!(q.params.len(), 1);

        let all = select_list(&author(), &[]);
        assert!(!all.sql.contains("WHERE"));
    }

    #[test]
    fn update_skips_primary_key_and_binds_id_last() {
        let q = update(&author(), &json!(7), &body(json!({"id": 9, "alias": "Pat"})));
        assert_eq!(
            q.sql,
            "UPDATE \"public\".\"author\" SET \"alias\" = $1::text WHERE \"id\" = $2::integer \
             RETURNING \"id\", \"name\", \"alias\", \"birth_date\""
        );
        assert_eq!(q.params[1], PgBindValue::I64(7));
    }

    #[test]
    fn empty_update_selects_current_row() {
        let q = update(&author(), &json!(7), &Map::new());
        assert!(q.sql.starts_with("SELECT"));
        assert_eq!(q.params, vec![PgBindValue::I64(7)]);
    }

    #[test]
    fn delete_and_select_by_id_cast_the_key() {
        let d = delete(&author(), &json!(3));
        assert!(d.sql.starts_with("DELETE FROM \"public\".\"author\" WHERE \"id\" = $1::integer RETURNING"));
        let s = select_by_id(&author(), &json!(3));
        assert!(s.sql.ends_with("WHERE \"id\" = $1::integer"));
    }

    #[test]
    fn create_table_emits_constraints() {
        let ddl = create_table(&author().in_schema("library"));
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"library\".\"author\""));
        assert!(ddl.contains("\"id\" INTEGER GENERATED BY DEFAULT AS IDENTITY NOT NULL"));
        assert!(ddl.contains("\"alias\" TEXT,"));
        assert!(ddl.contains("PRIMARY KEY (\"id\")"));
        assert!(ddl.contains("UNIQUE (\"name\", \"birth_date\")"));
    }
}
