//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid API keys, admin tokens, or logins
/// - **Validation Errors**: Empty payloads, disallowed files, bad requests
/// - **Storage Errors**: Failures writing uploaded files to disk
/// - **Resource Errors**: Admin-requested resources that don't exist
///
/// Notification delivery failure is deliberately NOT represented here: a
/// failed email never fails the submission request. It is recorded on the
/// submission row instead (see `services::submission_service`).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, inactive, or unknown.
    ///
    /// Unknown and deactivated keys are indistinguishable to the caller so
    /// that key existence is never leaked. Returns HTTP 401 Unauthorized.
    #[error("Invalid or inactive API key")]
    InvalidApiKey,

    /// Admin bearer token is missing, malformed, or expired.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authentication required")]
    AuthRequired,

    /// Admin email/password pair did not match.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid email or password")]
    InvalidLogin,

    /// Submission carried no form fields at all.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("No form data provided")]
    EmptyPayload,

    /// An uploaded file's extension is not in the allowed set.
    ///
    /// The String names the offending file. Returns HTTP 400 Bad Request.
    #[error("File type not allowed: {0}")]
    DisallowedFileType(String),

    /// Request body exceeded the configured maximum upload size.
    ///
    /// Returns HTTP 413 Payload Too Large.
    #[error("Payload exceeds maximum allowed size")]
    PayloadTooLarge,

    /// Writing an uploaded file to disk failed.
    ///
    /// The String holds the internal detail (logged, never returned).
    /// Returns HTTP 500 Internal Server Error.
    #[error("Storage write failed: {0}")]
    StorageWrite(String),

    /// Requested API key does not exist (admin surface).
    #[error("API key not found")]
    ApiKeyNotFound,

    /// Requested submission does not exist (admin surface).
    #[error("Submission not found")]
    SubmissionNotFound,

    /// Requested file does not exist, in the database or on disk.
    #[error("File not found")]
    FileNotFound,

    /// Request body or parameters are invalid.
    ///
    /// The String contains details about what was invalid.
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Catch-all for unexpected internal failures.
    ///
    /// Returns HTTP 500 with a generic message; detail is logged only.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Convert AppError into an HTTP response.
///
/// All errors share the uniform envelope:
/// ```json
/// {
///   "success": false,
///   "message": "Human-readable error message",
///   "errors": null
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidApiKey` / `AuthRequired` / `InvalidLogin` → 401
/// - `EmptyPayload` / `DisallowedFileType` / `InvalidRequest` → 400
/// - `PayloadTooLarge` → 413
/// - `*NotFound` → 404
/// - `Database` / `StorageWrite` / `Internal` → 500 (details hidden)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidApiKey | AppError::AuthRequired | AppError::InvalidLogin => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::EmptyPayload | AppError::DisallowedFileType(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::InvalidRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            AppError::ApiKeyNotFound | AppError::SubmissionNotFound | AppError::FileNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::StorageWrite(ref detail) => {
                tracing::error!("storage write failure: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to store uploaded file".to_string(),
                )
            }
            AppError::Database(ref err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(ref err) => {
                tracing::error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "errors": null,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disallowed_file_names_the_offender() {
        let err = AppError::DisallowedFileType("exploit.exe".to_string());
        assert_eq!(err.to_string(), "File type not allowed: exploit.exe");
    }

    #[test]
    fn internal_detail_is_not_client_visible() {
        let response =
            AppError::StorageWrite("disk full on /data/uploads".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
