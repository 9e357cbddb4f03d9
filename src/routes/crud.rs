//! CRUD routes for one resource: collection at `{path}`, items at `{path}/:id`.

use crate::handlers::crud::{create, delete_by_id, get_by_filters, get_by_id, update_by_id};
use crate::resource::CrudResource;
use crate::state::ResourceState;
use axum::{routing::get, Router};
use sqlx::PgPool;
use std::sync::Arc;

pub fn crud_routes(resource: Arc<CrudResource>, pool: PgPool) -> Router {
    let collection = resource.path.clone();
    let item = resource.item_path();
    Router::new()
        .route(&collection, get(get_by_filters).post(create))
        .route(&item, get(get_by_id).put(update_by_id).delete(delete_by_id))
        .with_state(ResourceState { pool, resource })
}
