//! Declaration validation: identifiers, primary key and constraint consistency.

use crate::config::TableDef;
use crate::error::ConfigError;
use std::collections::HashSet;

/// Identifiers end up quoted in SQL and as URL segments; keep them to a conservative charset.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_table(table: &TableDef) -> Result<(), ConfigError> {
    if !is_identifier(&table.name) {
        return Err(ConfigError::Validation(format!(
            "invalid table name '{}'",
            table.name
        )));
    }
    if let Some(schema) = &table.schema {
        if !is_identifier(schema) {
            return Err(ConfigError::Validation(format!(
                "table {}: invalid schema name '{}'",
                table.name, schema
            )));
        }
    }
    if table.columns.is_empty() {
        return Err(ConfigError::Validation(format!(
            "table {} has no columns",
            table.name
        )));
    }

    let mut names = HashSet::new();
    for c in &table.columns {
        if !is_identifier(&c.name) {
            return Err(ConfigError::Validation(format!(
                "table {}: invalid column name '{}'",
                table.name, c.name
            )));
        }
        if !names.insert(c.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "table {}: duplicate column '{}'",
                table.name, c.name
            )));
        }
        if c.autoincrement && !c.type_.is_integer() {
            return Err(ConfigError::Validation(format!(
                "table {}: autoincrement requires an integer column ('{}')",
                table.name, c.name
            )));
        }
    }

    let pks: Vec<&str> = table
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    match pks.len() {
        1 => {}
        0 => {
            return Err(ConfigError::InvalidPrimaryKey {
                table: table.name.clone(),
                reason: "no primary key column".into(),
            })
        }
        _ => {
            return Err(ConfigError::InvalidPrimaryKey {
                table: table.name.clone(),
                reason: format!("composite keys are not supported: {}", pks.join(", ")),
            })
        }
    }

    for group in &table.unique {
        if group.is_empty() {
            return Err(ConfigError::Validation(format!(
                "table {}: empty unique constraint",
                table.name
            )));
        }
        for col in group {
            if !names.contains(col.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "table {}: unique constraint references unknown column '{}'",
                    table.name, col
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnDef, ColumnType};

    fn author() -> TableDef {
        TableDef::new("author")
            .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
            .column(ColumnDef::new("name", ColumnType::Text).not_null())
    }

    #[test]
    fn accepts_well_formed_table() {
        assert!(validate_table(&author()).is_ok());
    }

    #[test]
    fn rejects_missing_and_composite_primary_keys() {
        let no_pk = TableDef::new("t").column(ColumnDef::new("a", ColumnType::Text));
        assert!(matches!(
            validate_table(&no_pk),
            Err(ConfigError::InvalidPrimaryKey { .. })
        ));

        let two_pk = author().column(ColumnDef::new("code", ColumnType::Text).primary_key());
        assert!(matches!(
            validate_table(&two_pk),
            Err(ConfigError::InvalidPrimaryKey { .. })
        ));
    }

    #[test]
    fn rejects_bad_identifiers_and_duplicates() {
        let quoted = TableDef::new("au\"thor").column(ColumnDef::new("id", ColumnType::Integer).primary_key());
        assert!(validate_table(&quoted).is_err());

        let dup = author().column(ColumnDef::new("name", ColumnType::Text));
        assert!(validate_table(&dup).is_err());
    }

    #[test]
    fn rejects_unique_on_unknown_column() {
        let t = author().unique_together(&["name", "birth_date"]);
        let err = validate_table(&t).unwrap_err();
        assert!(err.to_string().contains("birth_date"));
    }

    #[test]
    fn rejects_autoincrement_on_text() {
        let t = TableDef::new("tag")
            .column(ColumnDef::new("slug", ColumnType::Text).primary_key().autoincrement());
        assert!(validate_table(&t).is_err());
    }
}
