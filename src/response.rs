//! Uniform success response envelope.
//!
//! Every JSON response in the API, success or failure, uses the same shape:
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Form submitted successfully",
//!   "data": { ... }
//! }
//! ```
//!
//! The failure side of the envelope lives in `error.rs`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

/// Build a success response with data and a message.
pub fn success<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    let body = Json(json!({
        "success": true,
        "message": message,
        "data": data,
    }));
    (status, body).into_response()
}

/// Build a success response carrying only a message (e.g. after a delete).
pub fn success_message(message: &str) -> Response {
    let body = Json(json!({
        "success": true,
        "message": message,
        "data": null,
    }));
    (StatusCode::OK, body).into_response()
}
