use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Client input that cannot become a transaction.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unknown transaction type `{0}`, expected `receita` or `despesa`")]
    UnknownKind(String),
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid number `{value}` for `{field}`")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid request body: {0}")]
    Body(String),
    #[error("line {line}: {message}")]
    Csv { line: u64, message: String },
    #[error("invalid upload: {0}")]
    Upload(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt ledger row {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            ApiError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_error"),
        };

        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::warn!("rejected request: {}", self);
        }

        json_error(status, code, self.to_string())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
