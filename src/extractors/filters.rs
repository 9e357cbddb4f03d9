//! Extract list filters (`?column=value&...`) typed against the resource's table.

use crate::error::AppError;
use crate::state::ResourceState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde_json::Value;

/// Equality filters in query-string order, values coerced to column types.
#[derive(Clone, Debug, Default)]
pub struct ListFilters(pub Vec<(String, Value)>);

#[async_trait]
impl FromRequestParts<ResourceState> for ListFilters {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &ResourceState) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let filters = pairs
            .into_iter()
            .map(|(column, raw)| {
                let value = state.resource.coerce_filter(&column, &raw)?;
                Ok((column, value))
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(ListFilters(filters))
    }
}
