//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("duplicate path: {0}")]
    DuplicatePath(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid primary key: table {table} ({reason})")]
    InvalidPrimaryKey { table: String, reason: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => db_status(e),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        }
    }

    /// Message sent to the client. Driver text stays in the log.
    fn client_message(&self, code: &str) -> String {
        match (self, code) {
            (AppError::Db(_), "not_found") => "row not found".into(),
            (AppError::Db(_), "conflict") => "conflicts with an existing row".into(),
            (AppError::Db(_), "validation_error") => "value rejected by a column constraint".into(),
            (AppError::Db(_), _) => "database error".into(),
            _ => self.to_string(),
        }
    }
}

/// Map driver errors by SQLSTATE: integrity violations are client errors, the rest are ours.
fn db_status(e: &sqlx::Error) -> (StatusCode, &'static str) {
    if let sqlx::Error::RowNotFound = e {
        return (StatusCode::NOT_FOUND, "not_found");
    }
    let code = e
        .as_database_error()
        .and_then(|d| d.code())
        .map(|c| c.into_owned());
    match code.as_deref() {
        Some("23505") | Some("23503") => (StatusCode::CONFLICT, "conflict"),
        Some("23502") | Some("23514") => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
        Some(c) if c.starts_with("22") => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.client_message(code),
            },
        };
        (status, Json(body)).into_response()
    }
}
