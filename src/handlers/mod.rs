//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (form body, URL params, etc.)
//! 2. Performs business logic (database queries, validation, services)
//! 3. Returns HTTP response (JSON envelope, status code)

/// Admin API key management endpoints
pub mod api_keys;
/// Admin login and identity endpoints
pub mod auth;
/// Health check endpoint
pub mod health;
/// Public form submission endpoint
pub mod submit;
/// Admin submission review, download, and stats endpoints
pub mod submissions;
