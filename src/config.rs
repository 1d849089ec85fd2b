//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `UPLOAD_DIR` (optional): attachment storage root, defaults to `uploads`
/// - `MAX_UPLOAD_BYTES` (optional): request body cap, defaults to 10 MB
/// - `ALLOWED_EXTENSIONS` (optional): comma-separated extension allow-list
/// - `JWT_SECRET` (required): signing key for admin bearer tokens
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD` (optional): bootstrap admin account
/// - `RESEND_API_KEY` (optional): when set, notifications go out over the
///   Resend HTTP API; when unset, SMTP is used instead
/// - `SMTP_HOST` / `SMTP_PORT` / `SMTP_USERNAME` / `SMTP_PASSWORD`
/// - `SMTP_FROM_EMAIL` / `SMTP_FROM_NAME`: notification sender identity
/// - `APP_URL` (optional): public base URL, linked from notification footers
/// - `KEEP_ALIVE` (optional): enable the background self-ping task
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Root directory for stored attachments. Resolved to an absolute path
    /// at startup so attachment rows always record absolute storage paths.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Maximum accepted request body size in bytes. Requests above this are
    /// rejected with 413 before the body is fully read.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Comma-separated list of allowed attachment extensions (no dots).
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: String,

    pub jwt_secret: String,

    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,

    /// Primary notification transport credential. Its presence alone decides
    /// the transport: set means Resend, unset means SMTP.
    #[serde(default)]
    pub resend_api_key: Option<String>,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: String,

    #[serde(default)]
    pub smtp_password: String,

    #[serde(default)]
    pub smtp_from_email: String,

    #[serde(default = "default_from_name")]
    pub smtp_from_name: String,

    #[serde(default = "default_app_url")]
    pub app_url: String,

    #[serde(default)]
    pub keep_alive: bool,
}

fn default_port() -> u16 {
    3000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

/// 10 MB, matching the service's historical default.
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> String {
    "pdf,doc,docx,txt,png,jpg,jpeg,gif,zip".to_string()
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

fn default_admin_password() -> String {
    "changeme123".to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Form Service".to_string()
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing (DATABASE_URL,
    /// JWT_SECRET) or values cannot be parsed into the expected types.
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// The allowed-extension set, lowercased, empty entries dropped.
    pub fn allowed_extension_set(&self) -> HashSet<String> {
        self.allowed_extensions
            .split(',')
            .map(|ext| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            server_port: default_port(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_extensions: default_allowed_extensions(),
            jwt_secret: "secret".to_string(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
            resend_api_key: None,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_from_email: String::new(),
            smtp_from_name: default_from_name(),
            app_url: default_app_url(),
            keep_alive: false,
        }
    }

    #[test]
    fn extension_set_is_lowercased_and_trimmed() {
        let mut config = test_config();
        config.allowed_extensions = " PDF, jpg ,,Png".to_string();
        let set = config.allowed_extension_set();
        assert_eq!(set.len(), 3);
        assert!(set.contains("pdf"));
        assert!(set.contains("jpg"));
        assert!(set.contains("png"));
    }

    #[test]
    fn default_extensions_include_pdf() {
        let set = test_config().allowed_extension_set();
        assert!(set.contains("pdf"));
        assert!(set.contains("zip"));
        assert!(!set.contains("exe"));
    }
}
