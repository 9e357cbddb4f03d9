//! Router state for CRUD handlers: the shared pool plus the resource being served.

use crate::resource::CrudResource;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResourceState {
    pub pool: PgPool,
    pub resource: Arc<CrudResource>,
}
