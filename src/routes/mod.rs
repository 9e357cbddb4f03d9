pub mod common;
pub mod crud;
pub mod graphql;

pub use common::{common_routes, COMMON_PATHS};
pub use crud::crud_routes;
pub use graphql::{graphql_routes, GRAPHQL_PATH};
