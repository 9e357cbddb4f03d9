//! End-to-end CRUD against a real PostgreSQL. Skipped unless `TEST_DATABASE_URL` is set.
//! Each test creates its own uniquely named table and drops it afterwards.

mod common;

use axum::http::{Method, StatusCode};
use common::{author_table, book_table, send, BookModel};
use crudgen::{App, MetaRegistry, RequestModel, Settings, TableDef, TypedModel};
use serde_json::json;
use std::sync::Arc;

async fn app_for(
    prefix: &str,
    declare: fn(&str) -> TableDef,
    model: Option<Arc<dyn RequestModel>>,
) -> Option<(App, String)> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return None;
    };
    let table = format!("{}_{}", prefix, uuid::Uuid::new_v4().simple());
    let registry = MetaRegistry::new().with(declare(&table)).expect("table");
    let settings = Settings {
        database_url: url,
        max_connections: 2,
        ..Settings::default()
    };
    let mut app = App::start(&settings, registry).await.expect("startup");
    let path = format!("/{}", table);
    app.add_rest_crud_api(&path, &table, model).expect("routes");
    Some((app, table))
}

async fn author_app() -> Option<(App, String)> {
    app_for("author", author_table, None).await
}

async fn drop_table(app: &App, table: &str) {
    sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", table))
        .execute(app.pool())
        .await
        .expect("drop table");
}

#[tokio::test]
async fn create_then_get_returns_the_same_row() {
    let Some((app, table)) = author_app().await else { return };
    let router = app.router();
    let path = format!("/{}", table);

    let (status, created) = send(
        &router,
        Method::POST,
        &path,
        Some(json!({"name": "Patrick", "birth_date": "2020-01-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let row = &created["data"];
    assert!(row["id"].is_i64());
    assert_eq!(row["name"], "Patrick");
    assert_eq!(row["alias"], serde_json::Value::Null);
    assert_eq!(row["birth_date"], "2020-01-01");
    let keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["id", "name", "alias", "birth_date"]);

    let (status, fetched) = send(&router, Method::GET, &format!("{}/{}", path, row["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&fetched["data"], row);

    drop_table(&app, &table).await;
}

#[tokio::test]
async fn update_is_visible_to_later_reads() {
    let Some((app, table)) = author_app().await else { return };
    let router = app.router();
    let path = format!("/{}", table);

    let (_, created) = send(
        &router,
        Method::POST,
        &path,
        Some(json!({"name": "Patrick", "birth_date": "2020-01-01"})),
    )
    .await;
    let item = format!("{}/{}", path, created["data"]["id"]);

    let (status, updated) = send(&router, Method::PUT, &item, Some(json!({"alias": "Pat"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["alias"], "Pat");
    assert_eq!(updated["data"]["name"], "Patrick");

    let (_, fetched) = send(&router, Method::GET, &item, None).await;
    assert_eq!(fetched["data"]["alias"], "Pat");

    let (status, _) = send(&router, Method::PUT, &format!("{}/999999", path), Some(json!({"alias": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    drop_table(&app, &table).await;
}

#[tokio::test]
async fn delete_returns_the_row_and_it_is_gone() {
    let Some((app, table)) = author_app().await else { return };
    let router = app.router();
    let path = format!("/{}", table);

    let (_, created) = send(
        &router,
        Method::POST,
        &path,
        Some(json!({"name": "Patrick", "birth_date": "2020-01-01"})),
    )
    .await;
    let item = format!("{}/{}", path, created["data"]["id"]);

    let (status, deleted) = send(&router, Method::DELETE, &item, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"], created["data"]);

    let (status, body) = send(&router, Method::GET, &item, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(&router, Method::DELETE, &item, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    drop_table(&app, &table).await;
}

#[tokio::test]
async fn filters_select_matching_rows() {
    let Some((app, table)) = author_app().await else { return };
    let router = app.router();
    let path = format!("/{}", table);

    let (_, body) = send(&router, Method::GET, &path, None).await;
    assert_eq!(body, json!({"data": [], "meta": {"count": 0}}));

    for (name, date) in [("Patrick", "2020-01-01"), ("Sandy", "2019-05-05")] {
        let (status, _) = send(&router, Method::POST, &path, Some(json!({"name": name, "birth_date": date}))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, all) = send(&router, Method::GET, &path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["meta"]["count"], 2);
    assert_eq!(all["data"][0]["name"], "Patrick");

    let (_, one) = send(&router, Method::GET, &format!("{}?name=Sandy", path), None).await;
    assert_eq!(one["meta"]["count"], 1);
    assert_eq!(one["data"][0]["birth_date"], "2019-05-05");

    let (_, none) = send(&router, Method::GET, &format!("{}?name=Sandy&birth_date=2020-01-01", path), None).await;
    assert_eq!(none["data"], json!([]));

    drop_table(&app, &table).await;
}

#[tokio::test]
async fn unique_violation_is_a_conflict() {
    let Some((app, table)) = author_app().await else { return };
    let router = app.router();
    let path = format!("/{}", table);
    let body = json!({"name": "Patrick", "birth_date": "2020-01-01"});

    let (status, _) = send(&router, Method::POST, &path, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, err) = send(&router, Method::POST, &path, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "conflict");

    drop_table(&app, &table).await;
}

#[tokio::test]
async fn typed_model_creates_and_updates_rows() {
    let model: Arc<dyn RequestModel> = Arc::new(TypedModel::<BookModel>::new());
    let Some((app, table)) = app_for("book", book_table, Some(model)).await else { return };
    let router = app.router();
    let path = format!("/{}", table);

    let (status, created) = send(
        &router,
        Method::POST,
        &path,
        Some(json!({"name": "Sponge Bob", "publication_date": "2021-05-01", "revision": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["publication_date"], "2021-05-01");
    let item = format!("{}/{}", path, created["data"]["id"]);

    let (status, updated) = send(
        &router,
        Method::PUT,
        &item,
        Some(json!({"name": "Sponge Bob", "publication_date": "2021-06-01", "revision": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["revision"], 2);

    let (_, fetched) = send(&router, Method::GET, &item, None).await;
    assert_eq!(fetched["data"]["publication_date"], "2021-06-01");
    assert_eq!(fetched["data"]["revision"], 2);

    drop_table(&app, &table).await;
}
