//! One CRUD resource: a table bound to a URL path and a request model.

use crate::config::{ColumnType, TableDef};
use crate::error::{AppError, ConfigError};
use crate::model::{FieldKind, RequestModel, ValidationSchema};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Handler parameters for one table; shared read-only by all five endpoints.
pub struct CrudResource {
    pub path: String,
    pub table: Arc<TableDef>,
    pub model: Arc<dyn RequestModel>,
}

impl std::fmt::Debug for CrudResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudResource")
            .field("path", &self.path)
            .field("table", &self.table.name)
            .field("model", &self.model.name())
            .finish()
    }
}

impl CrudResource {
    /// Bind `table` at `path`. Without an explicit model the schema is derived from the table.
    pub fn new(
        path: &str,
        table: Arc<TableDef>,
        model: Option<Arc<dyn RequestModel>>,
    ) -> Result<Self, ConfigError> {
        let path = normalize_path(path)?;
        if table.primary_key().is_none() {
            return Err(ConfigError::InvalidPrimaryKey {
                table: table.name.clone(),
                reason: "no primary key column".into(),
            });
        }
        let model = match model {
            Some(m) => m,
            None => Arc::new(ValidationSchema::from_table(&table)?),
        };
        Ok(CrudResource { path, table, model })
    }

    /// Route pattern for single-item operations.
    pub fn item_path(&self) -> String {
        format!("{}/:id", self.path)
    }

    /// Every route pattern this resource registers.
    pub fn route_paths(&self) -> Vec<String> {
        vec![self.path.clone(), self.item_path()]
    }

    /// Parse a path id according to the primary key type. An integer outside the key's
    /// range names no row and is reported as not found.
    pub fn parse_id(&self, raw: &str) -> Result<Value, AppError> {
        let (name, ty) = match self.table.primary_key() {
            Some(pk) => (pk.name.as_str(), &pk.type_),
            None => ("id", &ColumnType::Text),
        };
        let kind = FieldKind::from(ty);
        let value = coerce(kind, raw).ok_or_else(|| AppError::BadRequest(format!("invalid id: {}", raw)))?;
        if kind.check(name, &value).is_err() {
            return Err(match kind {
                FieldKind::Integer { .. } => {
                    AppError::NotFound(format!("{} {}", self.table.name, raw))
                }
                _ => AppError::BadRequest(format!("invalid id: {}", raw)),
            });
        }
        Ok(value)
    }

    /// Coerce a query-string filter to the column's JSON form and check it against the
    /// column's range and format. Unknown columns are rejected.
    pub fn coerce_filter(&self, column: &str, raw: &str) -> Result<Value, AppError> {
        let col = self
            .table
            .column_named(column)
            .ok_or_else(|| AppError::BadRequest(format!("unknown filter column: {}", column)))?;
        let bad = || AppError::BadRequest(format!("invalid value for {}: {}", column, raw));
        let kind = FieldKind::from(&col.type_);
        let value = coerce(kind, raw).ok_or_else(bad)?;
        kind.check(column, &value).map_err(|_| bad())?;
        Ok(value)
    }

    /// Create body as the model accepts it, restricted to declared columns.
    pub fn create_body(&self, body: Value) -> Result<Map<String, Value>, AppError> {
        self.known_columns(self.model.validate_create(body)?)
    }

    pub fn update_body(&self, body: Value) -> Result<Map<String, Value>, AppError> {
        self.known_columns(self.model.validate_update(body)?)
    }

    fn known_columns(&self, body: Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        if let Some(field) = body.keys().find(|k| self.table.column_named(k).is_none()) {
            return Err(AppError::Validation(format!(
                "{}: {} has no column in {}",
                self.model.name(),
                field,
                self.table.name
            )));
        }
        Ok(body)
    }
}

/// Text from a URL to the JSON shape body validation expects for `kind`.
fn coerce(kind: FieldKind, raw: &str) -> Option<Value> {
    Some(match kind {
        FieldKind::Integer { .. } => Value::from(raw.parse::<i64>().ok()?),
        FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)?,
        FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => return None,
        },
        FieldKind::Json => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    })
}

/// `author/` -> `/author`. Paths are literal: no parameters or wildcards.
pub fn normalize_path(path: &str) -> Result<String, ConfigError> {
    let trimmed = path.trim().trim_end_matches('/');
    let normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    let valid = normalized.len() > 1
        && !normalized.contains("//")
        && normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.'));
    if !valid {
        return Err(ConfigError::InvalidPath(path.to_string()));
    }
    Ok(normalized)
}
