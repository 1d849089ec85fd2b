//! Admin user model for dashboard access.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents an admin user record from the database.
///
/// Maps to the `users` table. Admin users authenticate with email and
/// password (bcrypt-hashed) and receive a bearer token for the management
/// endpoints. There are no role distinctions; any admin can do anything.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Response body for user endpoints. Excludes the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<AdminUser> for UserResponse {
    fn from(user: AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}
