//! Admin API key management endpoints.
//!
//! - GET /api/keys - List all API keys (newest first)
//! - POST /api/keys - Create a new API key
//! - PUT /api/keys/{id} - Update an API key's metadata
//! - DELETE /api/keys/{id} - Delete a key and everything it owns

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::api_key::{
        ApiKey, ApiKeyResponse, CreateApiKeyRequest, UpdateApiKeyRequest, is_valid_email,
    },
    response,
    state::AppState,
};

/// List all API keys with their submission counts, newest first.
pub async fn list_api_keys(State(state): State<AppState>) -> Result<Response, AppError> {
    let keys = sqlx::query_as::<_, ApiKeyResponse>(
        r#"
        SELECT k.id, k.key, k.name, k.description, k.recipient_email, k.is_active,
               k.usage_count, k.last_used, k.created_at,
               COUNT(s.id) AS submission_count
        FROM api_keys k
        LEFT JOIN submissions s ON s.api_key_id = k.id
        GROUP BY k.id
        ORDER BY k.created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(response::success(StatusCode::OK, "OK", keys))
}

/// Create a new API key.
///
/// The credential string is generated server-side and returned in the
/// response; it never changes afterwards.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Marketing site contact form",
///   "description": "Footer form on example.com",
///   "recipient_email": "sales@example.com"
/// }
/// ```
pub async fn create_api_key(
    State(state): State<AppState>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<Response, AppError> {
    if request.name.is_empty() || request.recipient_email.is_empty() {
        return Err(AppError::InvalidRequest(
            "Name and recipient email are required".to_string(),
        ));
    }
    if !is_valid_email(&request.recipient_email) {
        return Err(AppError::InvalidRequest(
            "Invalid email address".to_string(),
        ));
    }

    let key = sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (key, name, description, recipient_email)
        VALUES ($1, $2, $3, $4)
        RETURNING id, key, name, description, recipient_email, is_active,
                  usage_count, last_used, created_at
        "#,
    )
    .bind(ApiKey::generate_key())
    .bind(&request.name)
    .bind(&request.description)
    .bind(&request.recipient_email)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("API key created: {}", key.name);

    let body = ApiKeyResponse {
        id: key.id,
        key: key.key,
        name: key.name,
        description: key.description,
        recipient_email: key.recipient_email,
        is_active: key.is_active,
        usage_count: key.usage_count,
        last_used: key.last_used,
        created_at: key.created_at,
        submission_count: 0,
    };

    Ok(response::success(
        StatusCode::CREATED,
        "API key created successfully",
        body,
    ))
}

/// Update an API key's metadata. Absent fields are left unchanged; the
/// credential string itself is immutable.
pub async fn update_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
    Json(request): Json<UpdateApiKeyRequest>,
) -> Result<Response, AppError> {
    if let Some(ref email) = request.recipient_email {
        if !is_valid_email(email) {
            return Err(AppError::InvalidRequest(
                "Invalid email address".to_string(),
            ));
        }
    }

    let updated = sqlx::query_as::<_, ApiKey>(
        r#"
        UPDATE api_keys
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            recipient_email = COALESCE($4, recipient_email),
            is_active = COALESCE($5, is_active)
        WHERE id = $1
        RETURNING id, key, name, description, recipient_email, is_active,
                  usage_count, last_used, created_at
        "#,
    )
    .bind(key_id)
    .bind(&request.name)
    .bind(&request.description)
    .bind(&request.recipient_email)
    .bind(request.is_active)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::ApiKeyNotFound)?;

    tracing::info!("API key updated: {}", updated.name);

    let submission_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE api_key_id = $1")
            .bind(key_id)
            .fetch_one(&state.pool)
            .await?;

    let body = ApiKeyResponse {
        id: updated.id,
        key: updated.key,
        name: updated.name,
        description: updated.description,
        recipient_email: updated.recipient_email,
        is_active: updated.is_active,
        usage_count: updated.usage_count,
        last_used: updated.last_used,
        created_at: updated.created_at,
        submission_count,
    };

    Ok(response::success(
        StatusCode::OK,
        "API key updated successfully",
        body,
    ))
}

/// Delete an API key.
///
/// The database cascades to the key's submissions and attachment rows; the
/// backing files are then removed from disk best-effort. A file that fails
/// to delete is logged and left behind rather than failing the request.
pub async fn delete_api_key(
    State(state): State<AppState>,
    Path(key_id): Path<Uuid>,
) -> Result<Response, AppError> {
    // Collect file paths before the cascade removes the rows.
    let paths: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT a.file_path
        FROM attachments a
        JOIN submissions s ON a.submission_id = s.id
        WHERE s.api_key_id = $1
        "#,
    )
    .bind(key_id)
    .fetch_all(&state.pool)
    .await?;

    let deleted = sqlx::query("DELETE FROM api_keys WHERE id = $1")
        .bind(key_id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::ApiKeyNotFound);
    }

    for path in &paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove stored file {path}: {e}");
        }
    }

    tracing::info!("API key deleted: {key_id}");

    Ok(response::success_message("API key deleted successfully"))
}
