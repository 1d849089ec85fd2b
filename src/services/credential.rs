//! API key validation.

use crate::{db::DbPool, error::AppError, models::api_key::ApiKey};

/// Resolve an opaque API key string to an active tenant record.
///
/// Single indexed lookup; no side effects. Unknown keys and deactivated
/// keys both fail with `InvalidApiKey` so the two cases are
/// indistinguishable to the caller and key existence is never leaked.
pub async fn validate_api_key(pool: &DbPool, key: &str) -> Result<ApiKey, AppError> {
    sqlx::query_as::<_, ApiKey>(
        "SELECT id, key, name, description, recipient_email, is_active,
                usage_count, last_used, created_at
         FROM api_keys
         WHERE key = $1 AND is_active = true",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::InvalidApiKey)
}
