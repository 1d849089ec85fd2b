//! Admin bearer-token authentication middleware.
//!
//! This middleware intercepts every management request to:
//! 1. Extract the bearer token from the Authorization header
//! 2. Verify its signature and expiry
//! 3. Inject the authenticated admin's identity into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! The ingestion endpoint does NOT go through this middleware; it
//! authenticates with the per-tenant API key in its URL instead.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Token lifetime: 24 hours.
const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// JWT claims carried by admin tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Admin user id
    pub sub: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Identity of the authenticated admin, injected into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub user_id: Uuid,
}

/// Issue a signed token for an admin user.
pub fn issue_token(secret: &str, user_id: Uuid) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + TOKEN_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.into()))
}

/// Admin authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Verify the token signature and expiry against the configured secret
/// 3. If valid: inject `CurrentAdmin` into request, call next handler
/// 4. If not: return 401 Unauthorized
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::AuthRequired)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::AuthRequired)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthRequired)?;

    let user_id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| AppError::AuthRequired)?;

    request.extensions_mut().insert(CurrentAdmin { user_id });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_with_the_same_secret() {
        let user_id = Uuid::new_v4();
        let token = issue_token("test-secret", user_id).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, user_id.to_string());
        assert!(data.claims.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn tokens_fail_with_a_different_secret() {
        let token = issue_token("secret-a", Uuid::new_v4()).unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret-b"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
