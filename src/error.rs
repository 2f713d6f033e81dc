//! Error types for the ArtEsfera service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Errors raised by the document store and object storage seams.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write precondition no longer holds; the caller may retry
    #[error("Write conflict on {0}")]
    Conflict(String),

    /// Document or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document does not belong to the collection it was written to
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Backend failure (network, permissions, quota)
    #[error("Backend error: {0}")]
    Backend(String),
}

// == App Error Enum ==
/// Unified error type for services and HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// Entity not found
    #[error("{0}")]
    NotFound(String),

    /// Malformed input (username format, missing fields)
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (ownership checks)
    #[error("{0}")]
    Forbidden(String),

    /// Business rule violated (deadline passed, duplicate application)
    #[error("{0}")]
    Rejected(String),

    /// Same logical request accepted too recently
    #[error("Too many requests: {0}")]
    Throttled(String),

    /// Optimistic transaction kept conflicting
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Document store or object storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Profile sync request failed
    #[error("Profile sync failed: {0}")]
    Sync(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Rejected(_) => StatusCode::CONFLICT,
            AppError::Throttled(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Sync(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::InvalidDocument(msg) => AppError::Internal(msg),
            StoreError::Backend(msg) => AppError::Storage(msg),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Sync(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the service.
pub type Result<T> = std::result::Result<T, AppError>;
