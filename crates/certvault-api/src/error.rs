//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps validation and store errors to HTTP status codes with a flat
//! `{code, message}` JSON body. Client errors carry their specific message
//! verbatim; server errors are logged and replaced with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::StoreError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. "NOT_FOUND", "DUPLICATE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Input failed validation (400).
    #[error("{0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// The certificate digest is already registered (400).
    #[error("{0}")]
    Duplicate(String),

    /// Request body exceeds the size limit (413).
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Missing or invalid bearer token (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Conflict with current resource state (409).
    #[error("{0}")]
    Conflict(String),

    /// The store cannot be reached (503). Message is logged, not returned.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Internal server error (500). Message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub(crate) fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Duplicate(_) => (StatusCode::BAD_REQUEST, "DUPLICATE"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::StorageUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// The message safe to show a client.
    pub fn public_message(&self) -> String {
        match self {
            Self::StorageUnavailable(_) => "Storage is temporarily unavailable".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::StorageUnavailable(_) => tracing::warn!(error = %self, "storage unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            code: code.to_string(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<certvault_core::ValidationError> for AppError {
    fn from(err: certvault_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => Self::Duplicate("Certificate already registered".into()),
            StoreError::NotFound(what) => Self::NotFound(format!("Certificate not found: {what}")),
            StoreError::AlreadyRevoked(hash) => {
                Self::Conflict(format!("Certificate {hash} is already revoked"))
            }
            StoreError::Unavailable(msg) => Self::StorageUnavailable(msg),
            err @ (StoreError::Backend(_) | StoreError::Corrupt(_)) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
