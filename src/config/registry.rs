//! Table registry: validated declarations owned by the application for its lifetime.

use crate::config::{validate_table, TableDef};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;

/// Registered tables in declaration order. Passed to `App`; never global.
#[derive(Clone, Debug, Default)]
pub struct MetaRegistry {
    tables: Vec<Arc<TableDef>>,
    by_name: HashMap<String, Arc<TableDef>>,
}

impl MetaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a table. Names are unique within the registry.
    pub fn add(&mut self, table: TableDef) -> Result<Arc<TableDef>, ConfigError> {
        validate_table(&table)?;
        if self.by_name.contains_key(&table.name) {
            return Err(ConfigError::DuplicateTable(table.name));
        }
        let table = Arc::new(table);
        self.by_name.insert(table.name.clone(), table.clone());
        self.tables.push(table.clone());
        Ok(table)
    }

    /// Builder-style `add` for declaring several tables in one expression.
    pub fn with(mut self, table: TableDef) -> Result<Self, ConfigError> {
        self.add(table)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TableDef>> {
        self.by_name.get(name)
    }

    pub fn tables(&self) -> &[Arc<TableDef>] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
