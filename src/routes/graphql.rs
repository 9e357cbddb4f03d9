//! GraphQL endpoint: queries over HTTP and subscriptions over WebSocket on one path.

use async_graphql::Executor;
use async_graphql_axum::{GraphQL, GraphQLSubscription};
use axum::{
    extract::{Request, State},
    http::header,
    response::Response,
    routing::any,
    Router,
};
use tower::ServiceExt;

pub const GRAPHQL_PATH: &str = "/graphql";

fn is_websocket_upgrade(req: &Request) -> bool {
    req.headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

async fn graphql_entry<E: Executor>(State(executor): State<E>, req: Request) -> Response {
    let result = if is_websocket_upgrade(&req) {
        GraphQLSubscription::new(executor).oneshot(req).await
    } else {
        GraphQL::new(executor).oneshot(req).await
    };
    match result {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// Mount `executor` (usually an `async_graphql::Schema`) at `/graphql`.
pub fn graphql_routes<E: Executor>(executor: E) -> Router {
    Router::new()
        .route(GRAPHQL_PATH, any(graphql_entry::<E>))
        .with_state(executor)
}
