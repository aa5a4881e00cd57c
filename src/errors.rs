/*!
 * Error types for the subtrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubtitleError {
    /// Translated batches do not line up with the document they came from
    #[error("Reassembly mismatch: {0}")]
    ReassemblyMismatch(String),
}

/// Request-level error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// The upload carried no subtitle file
    #[error("No files uploaded")]
    NoFiles,

    /// The request is malformed (bad multipart body, bad job id, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error while building the download archive
    #[error("Archive error: {0}")]
    Archive(String),

    /// Every file of the job failed
    #[error("No file could be translated")]
    NothingTranslated,

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// HTTP status the error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoFiles | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
