//! Shared fixtures: the author/book tables and a request helper over `Router::oneshot`.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use crudgen::{ColumnDef, ColumnType, MetaRegistry, TableDef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceExt;
use utoipa::ToSchema;

/// Typed body for book tables: every field is mandatory.
#[derive(Deserialize, Serialize, ToSchema)]
pub struct BookModel {
    pub name: String,
    pub publication_date: chrono::NaiveDate,
    pub revision: i32,
}

pub fn author_table(name: &str) -> TableDef {
    TableDef::new(name)
        .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
        .column(ColumnDef::new("name", ColumnType::Text).not_null())
        .column(ColumnDef::new("alias", ColumnType::Text))
        .column(ColumnDef::new("birth_date", ColumnType::Date).not_null())
        .unique_together(&["name", "birth_date"])
}

pub fn book_table(name: &str) -> TableDef {
    TableDef::new(name)
        .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
        .column(ColumnDef::new("name", ColumnType::Text).not_null())
        .column(ColumnDef::new("publication_date", ColumnType::Date))
        .column(ColumnDef::new("revision", ColumnType::Integer))
}

pub fn bookstore() -> MetaRegistry {
    MetaRegistry::new()
        .with(author_table("author"))
        .and_then(|r| r.with(book_table("book")))
        .expect("bookstore tables are valid")
}

/// A pool that never connects until used; points at a closed port so any query fails fast.
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(300))
        .connect_lazy("postgres://crudgen@127.0.0.1:1/unused")
        .expect("lazy pool")
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("infallible router");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, json)
}
