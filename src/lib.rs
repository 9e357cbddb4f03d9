//! crudgen: REST CRUD and GraphQL endpoints generated from declared PostgreSQL tables.

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod openapi;
pub mod resource;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use app::App;
pub use config::{from_json_str, load_from_path, ColumnDef, ColumnType, MetaRegistry, Settings, TableDef, ValidationRule};
pub use error::{AppError, ConfigError};
pub use migration::create_all;
pub use model::{RequestModel, TypedModel, ValidationSchema};
pub use resource::CrudResource;
pub use service::CrudService;
