//! Error types for the tax document server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::conversation::ConversationError;
use crate::export::ExportError;

/// Shown with every extraction failure
pub const EXTRACTION_HINT: &str = "Failed to extract tax document. Please ensure the image is clear and shows a W-2 or 1099-NEC form.";

/// Shown when the model could not be reached during extraction
pub const EXTRACTION_UNAVAILABLE_HINT: &str =
    "The extraction service is unavailable. Please try again later.";

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Unsupported or unreadable document {file}: {message}")]
    DocumentFormat { file: String, message: String },

    #[error("Extraction failed for {file}: {message}")]
    Extraction { file: String, message: String },

    #[error("Extraction model unavailable for {file}: {message}")]
    ExtractionUnavailable { file: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DocumentFormat { .. } => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Extraction { .. }
            | AppError::ExtractionUnavailable { .. }
            | AppError::Conversation(_)
            | AppError::Export(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text returned to the client; internal details stay in the log
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::DocumentFormat { file, message } => {
                format!("Failed to process file {}: {}", file, message)
            }
            AppError::Extraction { file, .. } => {
                format!("Failed to process file {}: {}", file, EXTRACTION_HINT)
            }
            AppError::ExtractionUnavailable { file, .. } => {
                format!("Failed to process file {}: {}", file, EXTRACTION_UNAVAILABLE_HINT)
            }
            AppError::Conversation(_) => {
                "Failed to get a response from the tax assistant".to_string()
            }
            AppError::Export(_) => "Failed to generate Excel file".to_string(),
            AppError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::Validation(format!("Invalid multipart request: {}", err.body_text()))
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
        });

        (status, body).into_response()
    }
}
