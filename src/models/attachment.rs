//! Attachment data models and API response types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a stored attachment record from the database.
///
/// # Database Table
///
/// Maps to the `attachments` table. Each attachment:
/// - Belongs to exactly one submission (cascade-deleted with it)
/// - Records both the client-supplied filename and the server-generated
///   storage name (timestamp + random token, unique within its directory)
/// - Is immutable after creation
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Attachment {
    /// Unique identifier for this attachment
    pub id: Uuid,

    /// Foreign key to the owning submission
    pub submission_id: Uuid,

    /// Filename as supplied by the client (untrusted, display only)
    pub original_filename: String,

    /// Server-generated storage filename
    pub stored_filename: String,

    /// Absolute path of the stored file on disk
    pub file_path: String,

    /// Size in bytes, as actually written (never client-declared)
    pub file_size: i64,

    /// Client-declared MIME type, if any
    pub mime_type: Option<String>,

    /// When this attachment was stored
    pub created_at: DateTime<Utc>,
}

/// Response body for attachment metadata.
///
/// The on-disk `file_path` is internal and never exposed; downloads go
/// through `/api/files/{id}/download` instead.
#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentResponse {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id,
            submission_id: attachment.submission_id,
            original_filename: attachment.original_filename,
            stored_filename: attachment.stored_filename,
            file_size: attachment.file_size,
            mime_type: attachment.mime_type,
            created_at: attachment.created_at,
        }
    }
}
