//! Health check endpoint for service monitoring.

use axum::{extract::State, http::StatusCode, response::Response};
use serde_json::json;

use crate::{error::AppError, response, state::AppState};

/// Health check handler.
///
/// Verifies database connectivity with a trivial query. Also the target of
/// the keep-alive pinger.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "success": true,
///   "message": null,
///   "data": { "status": "healthy" }
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Result<Response, AppError> {
    // Verify database connectivity with simple query
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(response::success(
        StatusCode::OK,
        "OK",
        json!({ "status": "healthy" }),
    ))
}
