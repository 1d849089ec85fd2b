//! Admin login and identity endpoints.
//!
//! - POST /api/auth/login - Exchange email/password for a bearer token
//! - GET /api/auth/me - Return the authenticated admin user

use axum::{Extension, Json, extract::State, http::StatusCode, response::Response};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    middleware::auth::{CurrentAdmin, issue_token},
    models::admin_user::{AdminUser, UserResponse},
    response,
    state::AppState,
};

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Authenticate an admin user.
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "message": "Login successful",
///   "data": {
///     "access_token": "eyJ...",
///     "user": { "id": "...", "email": "admin@example.com", ... }
///   }
/// }
/// ```
///
/// Unknown emails and wrong passwords both return 401 with the same
/// message, so account existence is not leaked.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidRequest(
            "Email and password required".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, AdminUser>(
        "SELECT id, email, password_hash, created_at, last_login FROM users WHERE email = $1",
    )
    .bind(&request.email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidLogin)?;

    let password_ok = bcrypt::verify(&request.password, &user.password_hash).unwrap_or(false);
    if !password_ok {
        return Err(AppError::InvalidLogin);
    }

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    let access_token = issue_token(&state.config.jwt_secret, user.id)?;

    Ok(response::success(
        StatusCode::OK,
        "Login successful",
        json!({
            "access_token": access_token,
            "user": UserResponse::from(user),
        }),
    ))
}

/// Return the currently authenticated admin user.
pub async fn me(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
) -> Result<Response, AppError> {
    let user = sqlx::query_as::<_, AdminUser>(
        "SELECT id, email, password_hash, created_at, last_login FROM users WHERE id = $1",
    )
    .bind(admin.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::AuthRequired)?;

    Ok(response::success(
        StatusCode::OK,
        "OK",
        UserResponse::from(user),
    ))
}
