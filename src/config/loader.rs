//! Load table declarations from JSON (a top-level array of tables).

use crate::config::{MetaRegistry, TableDef};
use crate::error::ConfigError;
use std::path::Path;

/// Parse a JSON array of table declarations into a validated registry.
pub fn from_json_str(json: &str) -> Result<MetaRegistry, ConfigError> {
    let tables: Vec<TableDef> =
        serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    let mut registry = MetaRegistry::new();
    for table in tables {
        registry.add(table)?;
    }
    Ok(registry)
}

pub async fn load_from_path(path: impl AsRef<Path>) -> Result<MetaRegistry, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading table declarations");
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    from_json_str(&json)
}
