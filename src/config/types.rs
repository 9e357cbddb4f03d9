//! Table declarations: columns, types and per-column validation rules.
//! Built in code through the fluent API or deserialized from JSON declarations.

use serde::{Deserialize, Serialize};

/// Scalar column type. JSON form is the lowercase SQL name, `{"varchar": n}` for bounded text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[serde(alias = "int2")]
    SmallInt,
    #[serde(alias = "int", alias = "int4")]
    Integer,
    #[serde(alias = "int8")]
    BigInt,
    #[serde(alias = "float4")]
    Real,
    #[serde(alias = "float8", alias = "float")]
    Double,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "string")]
    Text,
    Varchar(u32),
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    #[serde(alias = "jsonb")]
    Json,
}

impl ColumnType {
    /// Type used in CREATE TABLE. Autoincrement integers become identity columns.
    pub fn sql_type(&self, autoincrement: bool) -> String {
        let base = match self {
            ColumnType::Varchar(n) => return format!("VARCHAR({})", n),
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Real => "REAL",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::TimestampTz => "TIMESTAMPTZ",
            ColumnType::Uuid => "UUID",
            ColumnType::Json => "JSONB",
        };
        if autoincrement && self.is_integer() {
            format!("{} GENERATED BY DEFAULT AS IDENTITY", base)
        } else {
            base.to_string()
        }
    }

    /// Cast applied to every bound placeholder (`$n::cast`) so JSON values bind to the column type.
    pub fn cast(&self) -> &'static str {
        match self {
            ColumnType::SmallInt => "smallint",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Real => "real",
            ColumnType::Double => "double precision",
            ColumnType::Boolean => "boolean",
            ColumnType::Text | ColumnType::Varchar(_) => "text",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestamptz",
            ColumnType::Uuid => "uuid",
            ColumnType::Json => "jsonb",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Forces presence on create even when the column is nullable.
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub autoincrement: bool,
    /// SQL default expression, emitted verbatim in DDL (e.g. `now()`, `gen_random_uuid()`).
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
}

fn default_true() -> bool {
    true
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, type_: ColumnType) -> Self {
        ColumnDef {
            name: name.into(),
            type_,
            nullable: true,
            primary_key: false,
            unique: false,
            autoincrement: false,
            default: None,
            validation: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Primary key columns are never nullable.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn validation(mut self, rule: ValidationRule) -> Self {
        self.validation = Some(rule);
        self
    }

    /// Whether the database fills the value when the body omits it.
    pub fn has_default(&self) -> bool {
        self.default.is_some() || (self.autoincrement && self.type_.is_integer())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    /// PostgreSQL schema; `public` when omitted.
    #[serde(default)]
    pub schema: Option<String>,
    pub columns: Vec<ColumnDef>,
    /// Composite unique constraints, each a list of column names.
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        TableDef {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            unique: Vec::new(),
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn unique_together(mut self, columns: &[&str]) -> Self {
        self.unique.push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn schema_name(&self) -> &str {
        self.schema.as_deref().unwrap_or("public")
    }

    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.primary_key)
    }

    /// Primary key column name. Validated tables always declare one; `id` otherwise.
    pub fn pk_name(&self) -> &str {
        self.primary_key().map(|c| c.name.as_str()).unwrap_or("id")
    }

    pub fn column_named(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}
