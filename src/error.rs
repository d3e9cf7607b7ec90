//! Unified error type
//!
//! Built on `thiserror`; provides the `AppError` enum, the `AppResult`
//! alias and a `ResultExt` trait for attaching context.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// File operation error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// PDF could not be opened, parsed or rendered
    #[error("pdf error: {0}")]
    Pdf(String),

    /// Invalid input (e.g. an empty query)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Embedding collaborator failure; fatal while building an index
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Index persistence or artifact consistency error
    #[error("index error: {0}")]
    Index(String),

    /// Query-time embedding or search failure
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Generative model transport or HTTP failure
    #[error("generation error: {0}")]
    Generation(String),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Io(_) => "io",
            AppError::Json(_) => "json",
            AppError::Pdf(_) => "pdf",
            AppError::Validation(_) => "validation",
            AppError::Config(_) => "config",
            AppError::Embedding(_) => "embedding",
            AppError::Index(_) => "index",
            AppError::Retrieval(_) => "retrieval",
            AppError::Generation(_) => "generation",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ========== Serialize: errors go over the wire as {type, message} ==========

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("type", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(self)).into_response()
    }
}

/// Application-wide Result alias
pub type AppResult<T> = Result<T, AppError>;

// ========== Extension trait: attach context to foreign errors ==========

/// Adds error-context conversions to any `Result` whose error is `Display`
pub trait ResultExt<T> {
    /// Convert the error into a PDF error
    fn pdf_err(self, msg: &str) -> AppResult<T>;

    /// Convert the error into a configuration error
    fn config_err(self, msg: &str) -> AppResult<T>;

    /// Convert the error into an embedding error
    fn embedding_err(self, msg: &str) -> AppResult<T>;

    /// Convert the error into an index error
    fn index_err(self, msg: &str) -> AppResult<T>;

    /// Convert the error into a retrieval error
    fn retrieval_err(self, msg: &str) -> AppResult<T>;

    /// Convert the error into a generation error
    fn generation_err(self, msg: &str) -> AppResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn pdf_err(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Pdf(format!("{}: {}", msg, e)))
    }

    fn config_err(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Config(format!("{}: {}", msg, e)))
    }

    fn embedding_err(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Embedding(format!("{}: {}", msg, e)))
    }

    fn index_err(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Index(format!("{}: {}", msg, e)))
    }

    fn retrieval_err(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Retrieval(format!("{}: {}", msg, e)))
    }

    fn generation_err(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Generation(format!("{}: {}", msg, e)))
    }
}
