//! # Error Handling Middleware
//!
//! This module provides a standardized way to handle errors in the TutorLink
//! API. It maps domain-specific errors to appropriate HTTP status codes and
//! JSON error responses, ensuring a consistent error handling experience
//! across the entire API.
//!
//! Business-rule failures carry their user-facing reason through to the
//! response body; database and internal failures are logged here once and
//! surfaced as an opaque 500 without leaking internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tutorlink_core::errors::TutorError;

/// Application error wrapper that provides HTTP status code mapping
///
/// `AppError` wraps domain-specific `TutorError` instances and implements
/// `IntoResponse` to convert them into HTTP responses with appropriate
/// status codes and JSON payloads.
#[derive(Debug)]
pub struct AppError(pub TutorError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map error types to HTTP status codes
        let status = match &self.0 {
            TutorError::NotFound(_) => StatusCode::NOT_FOUND,
            TutorError::Validation(_) => StatusCode::BAD_REQUEST,
            TutorError::Authentication(_) => StatusCode::UNAUTHORIZED,
            TutorError::Authorization(_) => StatusCode::FORBIDDEN,
            TutorError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TutorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Persistence and internal failures are logged at this boundary and
        // replaced with an opaque message
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let body = Json(json!({ "error": message }));

        // Combine status code and JSON body into a response
        (status, body).into_response()
    }
}

/// Automatic conversion from TutorError to AppError
///
/// This implementation allows using `?` operator with functions that return
/// `Result<T, TutorError>` in handler functions that return
/// `Result<T, AppError>`.
impl From<TutorError> for AppError {
    fn from(err: TutorError) -> Self {
        AppError(err)
    }
}

/// Automatic conversion from eyre::Report to AppError
///
/// It wraps the eyre error in a TutorError::Database variant.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(TutorError::Database(err))
    }
}

/// Maps a TutorError to an HTTP response
pub fn map_error(err: TutorError) -> Response {
    AppError(err).into_response()
}
