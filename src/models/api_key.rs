//! API key data models and admin request/response types.
//!
//! An API key identifies one tenant of the form-intake gateway: external
//! forms post against the key, and accepted submissions are emailed to the
//! key's `recipient_email`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. Each key:
/// - Carries the opaque credential string presented in the submit URL
/// - Owns its submissions (deleting a key cascades to them)
/// - Tracks usage (count + last-used timestamp) on every accepted submission
///
/// # Key Storage
///
/// The credential is stored as issued, not hashed: the admin dashboard must
/// be able to show it back to the operator who hands it to form authors.
/// Once issued the credential itself is immutable; only the metadata around
/// it can change.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    /// Unique identifier for this API key
    pub id: Uuid,

    /// The opaque credential string (48 alphanumeric characters)
    pub key: String,

    /// Human-readable tenant name, used in notification subjects
    pub name: String,

    /// Free-text description shown in the dashboard
    pub description: String,

    /// Where submission notifications for this tenant are sent
    pub recipient_email: String,

    /// Whether this key is currently accepted
    ///
    /// Inactive keys are rejected during validation exactly like unknown
    /// ones, so deactivation never leaks key existence.
    pub is_active: bool,

    /// Number of accepted submissions made with this key
    pub usage_count: i64,

    /// When this key last accepted a submission
    pub last_used: Option<DateTime<Utc>>,

    /// Timestamp when this API key was created
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Generate a new 48-character alphanumeric credential.
    pub fn generate_key() -> String {
        const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::rng();
        (0..48)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// Request to create a new API key.
///
/// # Example
///
/// ```json
/// {
///   "name": "Marketing site contact form",
///   "description": "Footer form on example.com",
///   "recipient_email": "sales@example.com"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub recipient_email: String,
}

/// Request to update an API key. All fields are optional; absent fields are
/// left unchanged. The credential string itself can never be updated.
#[derive(Debug, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub recipient_email: Option<String>,
    pub is_active: Option<bool>,
}

/// Response body for API key endpoints.
///
/// Includes the credential itself (the dashboard displays it) and a derived
/// count of submissions made with the key.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub description: String,
    pub recipient_email: String,
    pub is_active: bool,
    pub usage_count: i64,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub submission_count: i64,
}

/// Basic email address shape check for `recipient_email`.
///
/// Deliberately loose: one `@` with a non-empty local part and a dotted
/// domain. Real validation happens when the mail provider accepts or
/// rejects the address.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_48_alphanumeric_chars() {
        let key = ApiKey::generate_key();
        assert_eq!(key.len(), 48);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(ApiKey::generate_key(), ApiKey::generate_key());
    }

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co.uk"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user@example.c"));
        assert!(!is_valid_email("user name@example.com"));
    }
}
