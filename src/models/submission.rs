//! Submission data models and API response types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::attachment::AttachmentResponse;

/// Represents a form submission record from the database.
///
/// # Database Table
///
/// Maps to the `submissions` table. Each submission:
/// - Belongs to exactly one API key (cascade-deleted with it)
/// - Stores the sanitized form fields as a JSON object (`data` is JSONB and
///   never empty; empty payloads are rejected before a row is created)
/// - Records whether the notification email went out, and the error if not
///
/// After creation the only fields ever mutated are `email_sent` and
/// `email_error`, once, within the same request that created the row.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Submission {
    /// Unique identifier for this submission
    pub id: Uuid,

    /// Foreign key to the API key this submission was made against
    pub api_key_id: Uuid,

    /// Sanitized form fields, arbitrary string keys, string values
    pub data: serde_json::Value,

    /// Submitter IP, as resolved through proxy headers
    pub ip_address: Option<String>,

    /// Submitter user agent, truncated to 255 characters
    pub user_agent: Option<String>,

    /// Whether the notification email was delivered
    pub email_sent: bool,

    /// Delivery error message when `email_sent` is false
    pub email_error: Option<String>,

    /// When this submission was accepted
    pub created_at: DateTime<Utc>,
}

/// Response body for submission endpoints, including attachments.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub api_key_id: Uuid,
    pub data: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub email_sent: bool,
    pub email_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub files: Vec<AttachmentResponse>,
}

impl SubmissionResponse {
    /// Combine a submission row with its attachment rows.
    pub fn from_parts(submission: Submission, files: Vec<AttachmentResponse>) -> Self {
        Self {
            id: submission.id,
            api_key_id: submission.api_key_id,
            data: submission.data,
            ip_address: submission.ip_address,
            user_agent: submission.user_agent,
            email_sent: submission.email_sent,
            email_error: submission.email_error,
            created_at: submission.created_at,
            files,
        }
    }
}

/// Paginated submission listing.
#[derive(Debug, Serialize)]
pub struct SubmissionPage {
    pub submissions: Vec<SubmissionResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
}
