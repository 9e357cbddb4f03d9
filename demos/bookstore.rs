//! Bookstore server: author, book and book_author CRUD plus a small GraphQL query root.
//!
//! Tables come from `TABLES_PATH` when set (every declared table gets CRUD at `/{name}`),
//! otherwise the built-in bookstore declarations are used.

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Schema, SimpleObject};
use chrono::NaiveDate;
use crudgen::{
    load_from_path, App, ColumnDef, ColumnType, MetaRegistry, Settings, TableDef, TypedModel,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::ToSchema;

fn bookstore_tables() -> Result<MetaRegistry, crudgen::ConfigError> {
    MetaRegistry::new()
        .with(
            TableDef::new("author")
                .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
                .column(ColumnDef::new("name", ColumnType::Text).not_null())
                .column(ColumnDef::new("alias", ColumnType::Text))
                .column(ColumnDef::new("birth_date", ColumnType::Date).not_null())
                .unique_together(&["name", "birth_date"]),
        )?
        .with(
            TableDef::new("book")
                .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
                .column(ColumnDef::new("name", ColumnType::Text).not_null())
                .column(ColumnDef::new("publication_date", ColumnType::Date))
                .column(ColumnDef::new("revision", ColumnType::Integer))
                .unique_together(&["name", "revision"]),
        )?
        .with(
            TableDef::new("book_author")
                .column(ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement())
                .column(ColumnDef::new("author_id", ColumnType::Integer).not_null())
                .column(ColumnDef::new("book_id", ColumnType::Integer).not_null()),
        )
}

/// Request body for `/book`: all three fields are mandatory, on update as well.
#[derive(Deserialize, Serialize, ToSchema)]
struct BookModel {
    name: String,
    publication_date: NaiveDate,
    revision: i32,
}

#[derive(SimpleObject)]
struct Author {
    id: i32,
    name: String,
    alias: Option<String>,
    birth_date: NaiveDate,
}

#[derive(SimpleObject)]
struct Book {
    id: i32,
    name: String,
    publication_date: Option<NaiveDate>,
    revision: Option<i32>,
}

struct Query;

#[Object]
impl Query {
    async fn authors(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Author>> {
        let pool = ctx.data::<PgPool>()?;
        let rows = sqlx::query("SELECT id, name, alias, birth_date FROM author ORDER BY id")
            .fetch_all(pool)
            .await?;
        rows.iter()
            .map(|r| -> async_graphql::Result<Author> {
                Ok(Author {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    alias: r.try_get("alias")?,
                    birth_date: r.try_get("birth_date")?,
                })
            })
            .collect()
    }

    async fn book(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<Option<Book>> {
        let pool = ctx.data::<PgPool>()?;
        let row = sqlx::query("SELECT id, name, publication_date, revision FROM book WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        let Some(r) = row else { return Ok(None) };
        Ok(Some(Book {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
            publication_date: r.try_get("publication_date")?,
            revision: r.try_get("revision")?,
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crudgen=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    let from_file = settings.tables_path.is_some();
    let registry = match &settings.tables_path {
        Some(path) => load_from_path(path).await?,
        None => bookstore_tables()?,
    };

    let mut app = App::start(&settings, registry).await?;
    if from_file {
        app.add_crud_from_registry()?;
    } else {
        app.add_rest_crud_api("/author", "author", None)?
            .add_rest_crud_api("/book", "book", Some(Arc::new(TypedModel::<BookModel>::new())))?
            .add_rest_crud_api("/book_author", "book_author", None)?;
        let schema = Schema::build(Query, EmptyMutation, EmptySubscription)
            .data(app.pool().clone())
            .finish();
        app.add_graphql_api(schema)?;
    }

    let listener = TcpListener::bind(settings.bind_addr).await?;
    app.serve(listener).await?;
    Ok(())
}
