//! CRUD handlers shared by every resource: create, get by id, list by filters, update, delete.

use crate::error::AppError;
use crate::extractors::ListFilters;
use crate::response::{success_created, success_many, success_one};
use crate::service::CrudService;
use crate::state::ResourceState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

pub async fn create(
    State(state): State<ResourceState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    let body = resource.create_body(json_body(body)?)?;
    let row = CrudService::create(&state.pool, &resource.table, &body).await?;
    tracing::debug!(table = %resource.table.name, "row created");
    Ok(success_created(row))
}

pub async fn get_by_id(
    State(state): State<ResourceState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    let id = resource.parse_id(&id_str)?;
    let row = CrudService::read(&state.pool, &resource.table, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", resource.table.name, id_str)))?;
    Ok(success_one(row))
}

pub async fn get_by_filters(
    State(state): State<ResourceState>,
    ListFilters(filters): ListFilters,
) -> Result<impl IntoResponse, AppError> {
    let rows = CrudService::list(&state.pool, &state.resource.table, &filters).await?;
    Ok(success_many(rows))
}

pub async fn update_by_id(
    State(state): State<ResourceState>,
    Path(id_str): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    let id = resource.parse_id(&id_str)?;
    let body = resource.update_body(json_body(body)?)?;
    let row = CrudService::update(&state.pool, &resource.table, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", resource.table.name, id_str)))?;
    Ok(success_one(row))
}

pub async fn delete_by_id(
    State(state): State<ResourceState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let resource = &state.resource;
    let id = resource.parse_id(&id_str)?;
    let row = CrudService::delete(&state.pool, &resource.table, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", resource.table.name, id_str)))?;
    tracing::debug!(table = %resource.table.name, id = %id_str, "row deleted");
    Ok(success_one(row))
}
