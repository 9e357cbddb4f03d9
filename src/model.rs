//! Request models: validate inbound bodies before they reach SQL.
//!
//! A model is either derived from a table declaration ([`ValidationSchema::from_table`]) or
//! supplied explicitly as a serde type ([`TypedModel`]). Derivation maps column types as:
//!
//! | column type | accepted JSON |
//! |---|---|
//! | smallint, integer, bigint | integer number within the column's range |
//! | real, double | any number |
//! | boolean | bool |
//! | text, varchar(n) | string (at most n characters) |
//! | date | `YYYY-MM-DD` |
//! | timestamp | RFC 3339 or `YYYY-MM-DDTHH:MM:SS[.f]` |
//! | timestamptz | RFC 3339 |
//! | uuid | UUID string |
//! | json | anything |
//!
//! Primary keys filled by the database are not part of the model. Non-nullable columns
//! without a default are required on create; updates accept any subset of fields.

use crate::config::{ColumnDef, ColumnType, TableDef};
use crate::error::{AppError, ConfigError};
use crate::openapi::model_schema;
use crate::service::FieldRule;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use utoipa::openapi::{RefOr, Schema};
use utoipa::ToSchema;

/// Validates create and update bodies for one resource.
pub trait RequestModel: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn validate_create(&self, body: Value) -> Result<Map<String, Value>, AppError>;

    fn validate_update(&self, body: Value) -> Result<Map<String, Value>, AppError>;

    /// Request body schema for the OpenAPI document; `None` leaves the body undocumented.
    fn openapi_schema(&self) -> Option<RefOr<Schema>> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKind {
    Integer { min: i64, max: i64 },
    Float,
    Boolean,
    String { max_length: Option<u32> },
    Date,
    DateTime,
    DateTimeTz,
    Uuid,
    Json,
}

impl From<&ColumnType> for FieldKind {
    fn from(ty: &ColumnType) -> Self {
        match ty {
            ColumnType::SmallInt => FieldKind::Integer {
                min: i16::MIN.into(),
                max: i16::MAX.into(),
            },
            ColumnType::Integer => FieldKind::Integer {
                min: i32::MIN.into(),
                max: i32::MAX.into(),
            },
            ColumnType::BigInt => FieldKind::Integer {
                min: i64::MIN,
                max: i64::MAX,
            },
            ColumnType::Real | ColumnType::Double => FieldKind::Float,
            ColumnType::Boolean => FieldKind::Boolean,
            ColumnType::Text => FieldKind::String { max_length: None },
            ColumnType::Varchar(n) => FieldKind::String { max_length: Some(*n) },
            ColumnType::Date => FieldKind::Date,
            ColumnType::Timestamp => FieldKind::DateTime,
            ColumnType::TimestampTz => FieldKind::DateTimeTz,
            ColumnType::Uuid => FieldKind::Uuid,
            ColumnType::Json => FieldKind::Json,
        }
    }
}

impl FieldKind {
    pub(crate) fn check(&self, name: &str, v: &Value) -> Result<(), AppError> {
        let ok = match self {
            FieldKind::Integer { min, max } => v.as_i64().is_some_and(|n| n >= *min && n <= *max),
            FieldKind::Float => v.is_number(),
            FieldKind::Boolean => v.is_boolean(),
            FieldKind::String { max_length } => match v.as_str() {
                Some(s) => {
                    if let Some(max) = max_length {
                        if s.chars().count() > *max as usize {
                            return Err(AppError::Validation(format!(
                                "{} must be at most {} characters",
                                name, max
                            )));
                        }
                    }
                    true
                }
                None => false,
            },
            FieldKind::Date => v
                .as_str()
                .is_some_and(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            FieldKind::DateTime => v.as_str().is_some_and(|s| {
                chrono::DateTime::parse_from_rfc3339(s).is_ok()
                    || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            }),
            FieldKind::DateTimeTz => v
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            FieldKind::Uuid => v.as_str().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()),
            FieldKind::Json => true,
        };
        if ok {
            Ok(())
        } else {
            Err(AppError::Validation(format!("{} must be {}", name, self.describe())))
        }
    }

    fn describe(&self) -> String {
        match self {
            FieldKind::Integer { min, max } => format!("an integer between {} and {}", min, max),
            FieldKind::Float => "a number".into(),
            FieldKind::Boolean => "a boolean".into(),
            FieldKind::String { .. } => "a string".into(),
            FieldKind::Date => "a date (YYYY-MM-DD)".into(),
            FieldKind::DateTime => "a timestamp".into(),
            FieldKind::DateTimeTz => "an RFC 3339 timestamp".into(),
            FieldKind::Uuid => "a UUID".into(),
            FieldKind::Json => "JSON".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Must be present on create.
    pub required: bool,
    pub nullable: bool,
    pub rule: Option<FieldRule>,
}

impl FieldSpec {
    fn from_column(c: &ColumnDef) -> Result<Self, ConfigError> {
        let rule = c
            .validation
            .as_ref()
            .map(|r| FieldRule::compile(&c.name, r))
            .transpose()?;
        let forced = rule.as_ref().is_some_and(FieldRule::forces_required);
        Ok(FieldSpec {
            name: c.name.clone(),
            kind: FieldKind::from(&c.type_),
            required: forced || (!c.nullable && !c.has_default()),
            nullable: c.nullable,
            rule,
        })
    }

    fn check(&self, v: &Value) -> Result<(), AppError> {
        if v.is_null() {
            if self.nullable {
                return Ok(());
            }
            return Err(AppError::Validation(format!("{} may not be null", self.name)));
        }
        self.kind.check(&self.name, v)?;
        if let Some(rule) = &self.rule {
            rule.check(&self.name, v)?;
        }
        Ok(())
    }
}

/// Field list mirroring the writable columns of a table.
#[derive(Clone, Debug)]
pub struct ValidationSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
}

impl ValidationSchema {
    pub fn from_table(table: &TableDef) -> Result<Self, ConfigError> {
        let fields = table
            .columns
            .iter()
            .filter(|c| !(c.primary_key && c.has_default()))
            .map(FieldSpec::from_column)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ValidationSchema {
            name: model_name(&table.name),
            fields,
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn validate(&self, body: Value, mode: Mode) -> Result<Map<String, Value>, AppError> {
        let Value::Object(body) = body else {
            return Err(AppError::Validation("body must be a JSON object".into()));
        };
        if let Some(unknown) = body.keys().find(|k| self.field(k).is_none()) {
            return Err(AppError::Validation(format!("unknown field: {}", unknown)));
        }
        for f in &self.fields {
            match body.get(&f.name) {
                Some(v) => f.check(v)?,
                None if mode == Mode::Create && f.required => {
                    return Err(AppError::Validation(format!("{} is required", f.name)));
                }
                None => {}
            }
        }
        Ok(body)
    }
}

impl RequestModel for ValidationSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_create(&self, body: Value) -> Result<Map<String, Value>, AppError> {
        self.validate(body, Mode::Create)
    }

    fn validate_update(&self, body: Value) -> Result<Map<String, Value>, AppError> {
        self.validate(body, Mode::Update)
    }

    fn openapi_schema(&self) -> Option<RefOr<Schema>> {
        Some(RefOr::T(Schema::Object(model_schema(self).build())))
    }
}

/// `book_author` -> `BookAuthorModel`.
fn model_name(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 5);
    for part in table.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out.push_str("Model");
    out
}

/// Explicit request model: bodies must deserialize into `T`; the re-serialized value is
/// what gets written. Updates require a full body too. `T`'s `ToSchema` derive documents
/// the body in the OpenAPI output.
pub struct TypedModel<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedModel<T> {
    pub fn new() -> Self {
        let full = std::any::type_name::<T>();
        let name = full.rsplit("::").next().unwrap_or(full).to_string();
        TypedModel {
            name,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TypedModel<T>
where
    T: DeserializeOwned + Serialize,
{
    fn parse(&self, body: Value) -> Result<Map<String, Value>, AppError> {
        let typed: T = serde_json::from_value(body)
            .map_err(|e| AppError::Validation(format!("{}: {}", self.name, e)))?;
        match serde_json::to_value(&typed) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AppError::Validation(format!(
                "{} does not serialize to an object",
                self.name
            ))),
            Err(e) => Err(AppError::Validation(e.to_string())),
        }
    }
}

impl<T> RequestModel for TypedModel<T>
where
    T: DeserializeOwned + Serialize + ToSchema + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_create(&self, body: Value) -> Result<Map<String, Value>, AppError> {
        self.parse(body)
    }

    fn validate_update(&self, body: Value) -> Result<Map<String, Value>, AppError> {
        self.parse(body)
    }

    fn openapi_schema(&self) -> Option<RefOr<Schema>> {
        Some(<T as utoipa::PartialSchema>::schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationRule;
    use serde::Deserialize;
    use serde_json::json;

    fn author() -> TableDef {
        TableDef::new("author")
            .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
            .column(
                ColumnDef::new("name", ColumnType::Varchar(20))
                    .not_null()
                    .validation(ValidationRule {
                        min_length: Some(2),
                        ..Default::default()
                    }),
            )
            .column(ColumnDef::new("alias", ColumnType::Text))
            .column(ColumnDef::new("birth_date", ColumnType::Date).not_null())
            .column(ColumnDef::new("active", ColumnType::Boolean).not_null().default_expr("true"))
    }

    #[test]
    fn derives_fields_and_requirements() {
        let schema = ValidationSchema::from_table(&author()).unwrap();
        assert_eq!(schema.name, "AuthorModel");
        assert!(schema.field("id").is_none());
        assert!(schema.field("name").unwrap().required);
        assert!(!schema.field("alias").unwrap().required);
        assert!(!schema.field("active").unwrap().required);
        assert_eq!(schema.field("birth_date").unwrap().kind, FieldKind::Date);
    }

    #[test]
    fn create_accepts_example_author() {
        let schema = ValidationSchema::from_table(&author()).unwrap();
        let body = schema
            .validate_create(json!({"name": "Patrick", "birth_date": "2020-01-01"}))
            .unwrap();
        assert_eq!(body["name"], "Patrick");
    }

    #[test]
    fn create_rejects_missing_required_and_bad_types() {
        let schema = ValidationSchema::from_table(&author()).unwrap();
        let err = schema.validate_create(json!({"name": "Patrick"})).unwrap_err();
        assert_eq!(err.to_string(), "validation: birth_date is required");
        assert!(schema
            .validate_create(json!({"name": "Patrick", "birth_date": "01/01/2020"}))
            .is_err());
        assert!(schema
            .validate_create(json!({"name": null, "birth_date": "2020-01-01"}))
            .is_err());
        assert!(schema
            .validate_create(json!({"name": "P", "birth_date": "2020-01-01"}))
            .is_err());
        assert!(schema
            .validate_create(json!({"name": "x".repeat(21), "birth_date": "2020-01-01"}))
            .is_err());
    }

    #[test]
    fn rejects_unknown_fields_and_non_objects() {
        let schema = ValidationSchema::from_table(&author()).unwrap();
        let err = schema.validate_update(json!({"id": 4})).unwrap_err();
        assert!(err.to_string().contains("unknown field: id"));
        assert!(schema.validate_update(json!([1, 2])).is_err());
    }

    #[test]
    fn update_is_partial() {
        let schema = ValidationSchema::from_table(&author()).unwrap();
        let body = schema.validate_update(json!({"alias": null})).unwrap();
        assert_eq!(body.len(), 1);
        assert!(schema.validate_update(json!({"active": "yes"})).is_err());
    }

    #[test]
    fn integer_ranges_follow_column_width() {
        let kind = FieldKind::from(&ColumnType::SmallInt);
        assert!(kind.check("n", &json!(32767)).is_ok());
        assert!(kind.check("n", &json!(32768)).is_err());
        assert!(kind.check("n", &json!(1.5)).is_err());
        assert!(FieldKind::DateTimeTz.check("t", &json!("2020-01-01T10:00:00Z")).is_ok());
        assert!(FieldKind::DateTime.check("t", &json!("2020-01-01T10:00:00")).is_ok());
        assert!(FieldKind::DateTimeTz.check("t", &json!("2020-01-01T10:00:00")).is_err());
    }

    #[derive(Serialize, Deserialize, ToSchema)]
    struct BookModel {
        name: String,
        publication_date: chrono::NaiveDate,
        revision: i32,
    }

    #[test]
    fn typed_model_round_trips_through_serde() {
        let model = TypedModel::<BookModel>::new();
        assert_eq!(model.name(), "BookModel");
        let body = model
            .validate_create(json!({"name": "Sponge Bob", "publication_date": "2021-05-01", "revision": 1}))
            .unwrap();
        assert_eq!(body["publication_date"], "2021-05-01");
        let err = model.validate_update(json!({"name": "Sponge Bob"})).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn schemas_document_what_each_model_requires() {
        let typed = serde_json::to_value(TypedModel::<BookModel>::new().openapi_schema()).unwrap();
        assert_eq!(typed["required"], json!(["name", "publication_date", "revision"]));

        let derived = ValidationSchema::from_table(&author()).unwrap();
        let derived = serde_json::to_value(derived.openapi_schema()).unwrap();
        assert_eq!(derived["properties"]["id"], Value::Null);
        assert!(derived["required"].as_array().unwrap().contains(&json!("name")));
    }

    #[test]
    fn model_names_are_pascal_case() {
        assert_eq!(model_name("book_author"), "BookAuthorModel");
        assert_eq!(model_name("book"), "BookModel");
    }
}
