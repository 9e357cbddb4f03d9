//! OpenAPI document for the registered resources, one tag per request model.

use crate::model::{FieldKind, ValidationSchema};
use crate::resource::CrudResource;
use std::sync::Arc;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItem};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{KnownFormat, ObjectBuilder, SchemaFormat, Type};
use utoipa::openapi::tag::Tag;
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, Info, OpenApi, OpenApiBuilder, PathsBuilder, Ref, Required,
    Response,
};

pub const OPENAPI_PATH: &str = "/openapi.json";

fn field_schema(kind: &FieldKind) -> ObjectBuilder {
    let (ty, format) = match kind {
        FieldKind::Integer { .. } => (Type::Integer, Some(KnownFormat::Int64)),
        FieldKind::Float => (Type::Number, Some(KnownFormat::Double)),
        FieldKind::Boolean => (Type::Boolean, None),
        FieldKind::String { max_length } => {
            return ObjectBuilder::new()
                .schema_type(Type::String)
                .max_length(max_length.map(|n| n as usize))
        }
        FieldKind::Date => (Type::String, Some(KnownFormat::Date)),
        FieldKind::DateTime | FieldKind::DateTimeTz => (Type::String, Some(KnownFormat::DateTime)),
        FieldKind::Uuid => (Type::String, Some(KnownFormat::Uuid)),
        FieldKind::Json => return ObjectBuilder::new(),
    };
    ObjectBuilder::new()
        .schema_type(ty)
        .format(format.map(SchemaFormat::KnownFormat))
}

/// Object schema for a table-derived model.
pub(crate) fn model_schema(schema: &ValidationSchema) -> ObjectBuilder {
    let mut obj = ObjectBuilder::new().schema_type(Type::Object);
    for f in &schema.fields {
        obj = obj.property(&f.name, field_schema(&f.kind));
        if f.required {
            obj = obj.required(&f.name);
        }
    }
    obj
}

fn id_parameter() -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .build()
}

/// Build the document: five operations per resource, request schemas from each model.
pub fn document(resources: &[Arc<CrudResource>]) -> OpenApi {
    let mut paths = PathsBuilder::new();
    let mut components = ComponentsBuilder::new();
    let mut tags = Vec::new();

    for r in resources {
        let tag = r.model.name().to_string();
        let body = match r.model.openapi_schema() {
            Some(schema) => {
                components = components.schema(tag.clone(), schema);
                Some(
                    RequestBodyBuilder::new()
                        .content(
                            "application/json",
                            ContentBuilder::new()
                                .schema(Some(Ref::from_schema_name(tag.clone())))
                                .build(),
                        )
                        .required(Some(Required::True))
                        .build(),
                )
            }
            None => None,
        };
        let op = |id: &str, summary: &str| {
            OperationBuilder::new()
                .tag(tag.clone())
                .operation_id(Some(format!("{}_{}", id, r.table.name)))
                .summary(Some(summary.to_string()))
        };
        let item = format!("{}/{{id}}", r.path);

        paths = paths
            .path(
                r.path.clone(),
                PathItem::new(
                    HttpMethod::Post,
                    op("create", "Create a new item")
                        .request_body(body.clone())
                        .response("201", Response::new("Created row")),
                ),
            )
            .path(
                r.path.clone(),
                PathItem::new(
                    HttpMethod::Get,
                    op("get_by_filters", "Get items by column filters")
                        .response("200", Response::new("Matching rows")),
                ),
            )
            .path(
                item.clone(),
                PathItem::new(
                    HttpMethod::Get,
                    op("get_by_id", "Get an item by ID")
                        .parameter(id_parameter())
                        .response("200", Response::new("Row"))
                        .response("404", Response::new("Not found")),
                ),
            )
            .path(
                item.clone(),
                PathItem::new(
                    HttpMethod::Put,
                    op("update_by_id", "Update an item by ID")
                        .parameter(id_parameter())
                        .request_body(body)
                        .response("200", Response::new("Updated row"))
                        .response("404", Response::new("Not found")),
                ),
            )
            .path(
                item,
                PathItem::new(
                    HttpMethod::Delete,
                    op("delete_by_id", "Delete an item by ID")
                        .parameter(id_parameter())
                        .response("200", Response::new("Deleted row"))
                        .response("404", Response::new("Not found")),
                ),
            );
        tags.push(Tag::new(tag));
    }

    OpenApiBuilder::new()
        .info(Info::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
        .paths(paths.build())
        .components(Some(components.build()))
        .tags(Some(tags))
        .build()
}
