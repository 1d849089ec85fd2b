//! Submission ingestion orchestration.
//!
//! One accepted form post runs through a linear pipeline:
//!
//! 1. Validate the API key (401 before anything is persisted)
//! 2. Reject empty payloads (400), then sanitize the fields
//! 3. Gate every uploaded file's extension, before any file is written
//! 4. Stage the submission row, store each file, stage each attachment row
//! 5. Dispatch the notification and record its outcome on the staged row
//! 6. Bump the key's usage counter and commit everything as one transaction
//!
//! # Failure Semantics
//!
//! Any failure before commit rolls back all staged rows; the usage counter
//! and submission must not survive a failed request. Files already written
//! to disk are tracked and best-effort removed on abort so a failed request
//! leaves no orphans behind. Notification failure is the one step that can
//! never fail the request: it is recorded, not raised.

use axum::body::Bytes;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{api_key::ApiKey, attachment::Attachment, submission::Submission},
    services::{attachment_store, credential, notifier::Notifier, sanitize},
};

/// One uploaded file part, buffered off the wire.
///
/// Files are buffered before any validation so the extension gate can be
/// evaluated across the whole set before the first byte hits disk.
#[derive(Debug)]
pub struct UploadedFile {
    /// Form field the file arrived under
    pub field_name: String,
    /// Client-supplied filename (untrusted)
    pub file_name: String,
    /// Client-declared MIME type, if any
    pub content_type: Option<String>,
    pub contents: Bytes,
}

/// Everything the pipeline needs from one inbound request.
#[derive(Debug)]
pub struct NewSubmission {
    /// Raw form fields in arrival order
    pub fields: Vec<(String, String)>,
    pub files: Vec<UploadedFile>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Context shared by the pipeline, borrowed from application state.
pub struct SubmissionContext<'a> {
    pub pool: &'a DbPool,
    pub notifier: &'a Notifier,
    pub upload_dir: &'a std::path::Path,
    pub allowed_extensions: std::collections::HashSet<String>,
}

/// Process one form submission end to end.
///
/// Returns the new submission's id on success. See the module docs for the
/// pipeline and its failure semantics.
pub async fn process_submission(
    ctx: &SubmissionContext<'_>,
    api_key: &str,
    input: NewSubmission,
) -> Result<Uuid, AppError> {
    // Credential first: nothing is persisted for an invalid key.
    let key = credential::validate_api_key(ctx.pool, api_key).await?;

    // The empty-payload check runs on the raw mapping, before sanitization.
    if input.fields.is_empty() {
        return Err(AppError::EmptyPayload);
    }
    let data = sanitize::sanitize_form_data(input.fields.clone());

    // All-or-nothing extension gate: every file is checked before any file
    // is written, so a disallowed third file cannot leave two stored ones.
    for file in &input.files {
        if !attachment_store::allowed_file(&file.file_name, &ctx.allowed_extensions) {
            return Err(AppError::DisallowedFileType(file.file_name.clone()));
        }
    }

    let mut stored_paths: Vec<PathBuf> = Vec::new();
    match ingest(ctx, &key, data, &input, &mut stored_paths).await {
        Ok(submission_id) => {
            tracing::info!(
                "Form submission {submission_id} accepted for API key: {}",
                key.name
            );
            Ok(submission_id)
        }
        Err(e) => {
            // The database transaction rolled back on drop; now reclaim any
            // files that made it to disk before the abort.
            remove_stored_files(&stored_paths).await;
            Err(e)
        }
    }
}

/// The transactional part of the pipeline. Every path written to disk is
/// pushed into `stored_paths` immediately, so the caller can clean up when
/// this returns an error and the transaction rolls back.
async fn ingest(
    ctx: &SubmissionContext<'_>,
    key: &ApiKey,
    data: serde_json::Map<String, serde_json::Value>,
    input: &NewSubmission,
    stored_paths: &mut Vec<PathBuf>,
) -> Result<Uuid, AppError> {
    let mut tx = ctx.pool.begin().await?;

    // Stage the submission row. Not durable until commit.
    let submission = sqlx::query_as::<_, Submission>(
        r#"
        INSERT INTO submissions (api_key_id, data, ip_address, user_agent)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(key.id)
    .bind(serde_json::Value::Object(data.clone()))
    .bind(&input.ip_address)
    .bind(&input.user_agent)
    .fetch_one(&mut *tx)
    .await?;

    // Store each accepted file and stage its attachment row.
    let mut attachments: Vec<Attachment> = Vec::new();
    for file in &input.files {
        let stored = attachment_store::save_attachment(
            ctx.upload_dir,
            key.id,
            &file.file_name,
            &file.contents,
        )
        .await?;
        stored_paths.push(stored.path.clone());

        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (
                submission_id,
                original_filename,
                stored_filename,
                file_path,
                file_size,
                mime_type
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(submission.id)
        .bind(&file.file_name)
        .bind(&stored.stored_filename)
        .bind(stored.path.to_string_lossy().as_ref())
        .bind(stored.size)
        .bind(&file.content_type)
        .fetch_one(&mut *tx)
        .await?;
        attachments.push(attachment);
    }

    // Notification cannot fail the request; the outcome lands on the row.
    let outcome = ctx
        .notifier
        .send_submission_notification(&key.recipient_email, &key.name, &data, &attachments)
        .await;

    sqlx::query("UPDATE submissions SET email_sent = $1, email_error = $2 WHERE id = $3")
        .bind(outcome.delivered)
        .bind(&outcome.error)
        .bind(submission.id)
        .execute(&mut *tx)
        .await?;

    // Atomic increment at the store level: concurrent submissions against
    // the same key never lose an update.
    sqlx::query(
        "UPDATE api_keys SET usage_count = usage_count + 1, last_used = NOW() WHERE id = $1",
    )
    .bind(key.id)
    .execute(&mut *tx)
    .await?;

    // Commit the submission, its attachments, the notification outcome, and
    // the usage bump as one unit.
    tx.commit().await?;

    Ok(submission.id)
}

/// Best-effort removal of files written during an aborted request.
pub async fn remove_stored_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove stored file {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            field_name: "upload".to_string(),
            file_name: name.to_string(),
            content_type: None,
            contents: Bytes::from_static(b"data"),
        }
    }

    fn allowed() -> HashSet<String> {
        ["pdf", "txt"].iter().map(|s| s.to_string()).collect()
    }

    // The gate itself lives in attachment_store; these cover the pipeline's
    // use of it: every file checked, first offender reported.
    #[test]
    fn gate_names_the_first_disallowed_file() {
        let files = vec![file("ok.pdf"), file("bad.exe"), file("also-bad.sh")];
        let allowed = allowed();
        let offender = files
            .iter()
            .find(|f| !attachment_store::allowed_file(&f.file_name, &allowed));
        assert_eq!(offender.unwrap().file_name, "bad.exe");
    }

    #[test]
    fn gate_passes_when_all_files_allowed() {
        let files = vec![file("a.pdf"), file("b.TXT")];
        let allowed = allowed();
        assert!(
            files
                .iter()
                .all(|f| attachment_store::allowed_file(&f.file_name, &allowed))
        );
    }

    #[tokio::test]
    async fn abort_cleanup_removes_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.txt");
        let doomed = dir.path().join("doomed.txt");
        std::fs::write(&kept, b"kept").unwrap();
        std::fs::write(&doomed, b"doomed").unwrap();

        remove_stored_files(&[doomed.clone()]).await;

        assert!(kept.exists());
        assert!(!doomed.exists());
    }

    #[tokio::test]
    async fn abort_cleanup_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let never_written = dir.path().join("missing.txt");
        // Must not panic or error; the warning is logged and ignored.
        remove_stored_files(&[never_written]).await;
    }
}
