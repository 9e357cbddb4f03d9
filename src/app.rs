//! Application bootstrap: owns the database pool and table registry, collects CRUD and
//! GraphQL registrations and serves them.

use crate::config::{MetaRegistry, Settings, DEFAULT_BODY_LIMIT_BYTES};
use crate::error::{AppError, ConfigError};
use crate::migration::create_all;
use crate::model::RequestModel;
use crate::openapi::{document, OPENAPI_PATH};
use crate::resource::CrudResource;
use crate::routes::{common_routes, crud_routes, graphql_routes, COMMON_PATHS, GRAPHQL_PATH};
use crate::store;
use async_graphql::Executor;
use axum::{routing::get, Json, Router};
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

pub struct App {
    pool: PgPool,
    registry: MetaRegistry,
    resources: Vec<Arc<CrudResource>>,
    routers: Vec<Router>,
    paths: BTreeSet<String>,
    body_limit_bytes: usize,
}

impl App {
    /// Startup: open the pool described by `settings` and create every registered table.
    pub async fn start(settings: &Settings, registry: MetaRegistry) -> Result<Self, AppError> {
        let pool = store::connect(settings).await?;
        create_all(&pool, &registry).await?;
        let mut app = Self::with_pool(pool, registry);
        app.body_limit_bytes = settings.body_limit_bytes;
        Ok(app)
    }

    /// Wrap an existing pool. No connection or DDL happens here.
    pub fn with_pool(pool: PgPool, registry: MetaRegistry) -> Self {
        let paths = COMMON_PATHS
            .iter()
            .chain(std::iter::once(&OPENAPI_PATH))
            .map(|p| p.to_string())
            .collect();
        App {
            pool,
            registry,
            resources: Vec::new(),
            routers: Vec::new(),
            paths,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn registry(&self) -> &MetaRegistry {
        &self.registry
    }

    pub fn resources(&self) -> &[Arc<CrudResource>] {
        &self.resources
    }

    /// Every route pattern claimed so far, built-in routes included.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Claim all of `paths` or none of them.
    fn reserve(&mut self, paths: &[String]) -> Result<(), ConfigError> {
        if let Some(taken) = paths.iter().find(|p| self.paths.contains(*p)) {
            return Err(ConfigError::DuplicatePath(taken.clone()));
        }
        self.paths.extend(paths.iter().cloned());
        Ok(())
    }

    /// Register the five CRUD operations for `table` under `path`.
    /// Without `model`, request bodies are validated against a schema derived from the table.
    pub fn add_rest_crud_api(
        &mut self,
        path: &str,
        table: &str,
        model: Option<Arc<dyn RequestModel>>,
    ) -> Result<&mut Self, ConfigError> {
        let table = self
            .registry
            .get(table)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTable(table.to_string()))?;
        let resource = Arc::new(CrudResource::new(path, table, model)?);
        self.reserve(&resource.route_paths())?;
        tracing::info!(
            path = %resource.path,
            table = %resource.table.name,
            model = %resource.model.name(),
            "registered CRUD routes"
        );
        self.routers.push(crud_routes(resource.clone(), self.pool.clone()));
        self.resources.push(resource);
        Ok(self)
    }

    /// Register CRUD for every table in the registry at `/{table name, lowercased}`.
    pub fn add_crud_from_registry(&mut self) -> Result<&mut Self, ConfigError> {
        let names: Vec<String> = self.registry.tables().iter().map(|t| t.name.clone()).collect();
        for name in names {
            let path = format!("/{}", name.trim().to_lowercase());
            self.add_rest_crud_api(&path, &name, None)?;
        }
        Ok(self)
    }

    /// Mount a GraphQL schema at `/graphql` for HTTP queries and WebSocket subscriptions.
    pub fn add_graphql_api<E: Executor>(&mut self, executor: E) -> Result<&mut Self, ConfigError> {
        self.reserve(&[GRAPHQL_PATH.to_string()])?;
        tracing::info!(path = GRAPHQL_PATH, "registered GraphQL endpoint");
        self.routers.push(graphql_routes(executor));
        Ok(self)
    }

    /// The complete router: common routes, OpenAPI document and every registration.
    pub fn router(&self) -> Router {
        let doc = Arc::new(document(&self.resources));
        let openapi = Router::new().route(
            OPENAPI_PATH,
            get(move || {
                let doc = doc.clone();
                async move { Json(doc.as_ref().clone()) }
            }),
        );
        self.routers
            .iter()
            .cloned()
            .fold(common_routes(self.pool.clone()).merge(openapi), |acc, r| acc.merge(r))
            .layer(RequestBodyLimitLayer::new(self.body_limit_bytes))
    }

    /// Serve until Ctrl-C or SIGTERM, then close the pool.
    pub async fn serve(self, listener: TcpListener) -> Result<(), AppError> {
        let router = self.router();
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("shutting down");
        store::close(&self.pool).await;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
