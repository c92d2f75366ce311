use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;

const INTERNAL_ERROR: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Product with this name already exists")]
    DuplicateName(String),

    #[error("Product not found")]
    NotFound,

    #[error("Invalid product id: {0}")]
    InvalidId(String),

    #[error("Malformed request body: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName(name) => AppError::DuplicateName(name),
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateName(_) | AppError::InvalidId(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to clients. Store failures stay generic.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Store(_) => INTERNAL_ERROR.to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        if let AppError::Store(err) = self {
            error!(error = %err, "Document store operation failed");
        }
    }
}

/// Plain-text error body, as the product CRUD routes answer.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), self.public_message()).into_response()
    }
}

/// Renders an [`AppError`] as `{"error": "..."}` instead of plain text.
#[derive(Debug)]
pub struct JsonError(pub AppError);

impl From<AppError> for JsonError {
    fn from(err: AppError) -> Self {
        JsonError(err)
    }
}

impl From<StoreError> for JsonError {
    fn from(err: StoreError) -> Self {
        JsonError(err.into())
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        self.0.log();
        let status = self.0.status();
        (status, Json(json!({ "error": self.0.public_message() }))).into_response()
    }
}
