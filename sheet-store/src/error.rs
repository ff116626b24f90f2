use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum SheetStoreError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Failed to parse spreadsheet: {message}")]
    Parse { message: String },

    #[error("Dataset not found: {dataset_id}")]
    DatasetNotFound { dataset_id: i64 },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl SheetStoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        SheetStoreError::Validation {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SheetStoreError::Validation { .. } => StatusCode::BAD_REQUEST,
            SheetStoreError::DatasetNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent back to HTTP clients. Server-side failures are reported
    /// generically; the detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            SheetStoreError::Validation { message } => message.clone(),
            SheetStoreError::DatasetNotFound { .. } => "Not found".to_string(),
            SheetStoreError::Parse { .. } => "Failed to parse spreadsheet".to_string(),
            SheetStoreError::Store { .. } => "Dataset store failure".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<std::io::Error> for SheetStoreError {
    fn from(err: std::io::Error) -> Self {
        SheetStoreError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<diesel::result::Error> for SheetStoreError {
    fn from(err: diesel::result::Error) -> Self {
        SheetStoreError::Store {
            message: format!("Database error: {}", err),
        }
    }
}

impl From<calamine::Error> for SheetStoreError {
    fn from(err: calamine::Error) -> Self {
        SheetStoreError::Parse {
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for SheetStoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        SheetStoreError::InternalError {
            message: format!("Background task failed: {}", err),
        }
    }
}

impl IntoResponse for SheetStoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
