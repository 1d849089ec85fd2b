//! Admin submission review endpoints.
//!
//! - GET /api/submissions - Paginated listing, optionally filtered by key
//! - GET /api/submissions/{id} - Fetch one submission with its attachments
//! - DELETE /api/submissions/{id} - Delete a submission and its files
//! - GET /api/files/{id}/download - Download a stored attachment
//! - GET /api/stats - Dashboard statistics

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        attachment::{Attachment, AttachmentResponse},
        submission::{Submission, SubmissionPage, SubmissionResponse},
    },
    response,
    state::AppState,
};

/// Query parameters for the submission listing.
#[derive(Debug, Deserialize)]
pub struct ListSubmissionsQuery {
    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_per_page")]
    pub per_page: i64,

    /// Restrict the listing to one API key
    pub api_key_id: Option<Uuid>,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

/// Clamp raw pagination parameters to sane bounds.
fn clamp_pagination(page: i64, per_page: i64) -> (i64, i64) {
    (page.max(1), per_page.clamp(1, 100))
}

/// Number of pages needed for `total` rows at `per_page` rows each.
fn page_count(total: i64, per_page: i64) -> i64 {
    (total + per_page - 1) / per_page
}

/// List submissions, newest first, with attachments included.
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<Response, AppError> {
    let (page, per_page) = clamp_pagination(query.page, query.per_page);

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM submissions WHERE $1::uuid IS NULL OR api_key_id = $1",
    )
    .bind(query.api_key_id)
    .fetch_one(&state.pool)
    .await?;

    let submissions = sqlx::query_as::<_, Submission>(
        r#"
        SELECT * FROM submissions
        WHERE $1::uuid IS NULL OR api_key_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(query.api_key_id)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(&state.pool)
    .await?;

    let mut files_by_submission = attachments_for(&state.pool, &submissions).await?;

    let submissions = submissions
        .into_iter()
        .map(|s| {
            let files = files_by_submission.remove(&s.id).unwrap_or_default();
            SubmissionResponse::from_parts(s, files)
        })
        .collect();

    let body = SubmissionPage {
        submissions,
        total,
        page,
        per_page,
        pages: page_count(total, per_page),
    };

    Ok(response::success(StatusCode::OK, "OK", body))
}

/// Batch-fetch attachments for a page of submissions, grouped by owner.
async fn attachments_for(
    pool: &DbPool,
    submissions: &[Submission],
) -> Result<HashMap<Uuid, Vec<AttachmentResponse>>, AppError> {
    let mut grouped: HashMap<Uuid, Vec<AttachmentResponse>> = HashMap::new();
    if submissions.is_empty() {
        return Ok(grouped);
    }

    let ids: Vec<Uuid> = submissions.iter().map(|s| s.id).collect();
    let attachments = sqlx::query_as::<_, Attachment>(
        "SELECT * FROM attachments WHERE submission_id = ANY($1) ORDER BY created_at",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    for attachment in attachments {
        grouped
            .entry(attachment.submission_id)
            .or_default()
            .push(attachment.into());
    }
    Ok(grouped)
}

/// Fetch a single submission with its attachments.
pub async fn get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let submission = sqlx::query_as::<_, Submission>("SELECT * FROM submissions WHERE id = $1")
        .bind(submission_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::SubmissionNotFound)?;

    let files = sqlx::query_as::<_, Attachment>(
        "SELECT * FROM attachments WHERE submission_id = $1 ORDER BY created_at",
    )
    .bind(submission_id)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(AttachmentResponse::from)
    .collect();

    Ok(response::success(
        StatusCode::OK,
        "OK",
        SubmissionResponse::from_parts(submission, files),
    ))
}

/// Delete a submission.
///
/// Attachment rows go with it via the cascade; backing files are removed
/// from disk best-effort afterwards.
pub async fn delete_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let paths: Vec<String> =
        sqlx::query_scalar("SELECT file_path FROM attachments WHERE submission_id = $1")
            .bind(submission_id)
            .fetch_all(&state.pool)
            .await?;

    let deleted = sqlx::query("DELETE FROM submissions WHERE id = $1")
        .bind(submission_id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::SubmissionNotFound);
    }

    for path in &paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove stored file {path}: {e}");
        }
    }

    tracing::info!("Submission deleted: {submission_id}");

    Ok(response::success_message("Submission deleted successfully"))
}

/// Download a stored attachment, streaming it back under its original
/// client-supplied filename.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let attachment = sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = $1")
        .bind(file_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::FileNotFound)?;

    let contents = tokio::fs::read(&attachment.file_path)
        .await
        .map_err(|_| AppError::FileNotFound)?;

    let content_type = attachment
        .mime_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    // Quotes in the original filename would break the header value.
    let download_name = attachment.original_filename.replace('"', "_");

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
        ],
        contents,
    )
        .into_response())
}

/// Dashboard statistics: key/submission/file totals plus recent activity.
pub async fn get_stats(State(state): State<AppState>) -> Result<Response, AppError> {
    let total_api_keys: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
        .fetch_one(&state.pool)
        .await?;
    let active_api_keys: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE is_active = true")
            .fetch_one(&state.pool)
            .await?;
    let total_submissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
        .fetch_one(&state.pool)
        .await?;
    let recent_submissions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM submissions WHERE created_at >= NOW() - INTERVAL '7 days'",
    )
    .fetch_one(&state.pool)
    .await?;
    let total_files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments")
        .fetch_one(&state.pool)
        .await?;

    Ok(response::success(
        StatusCode::OK,
        "OK",
        json!({
            "total_api_keys": total_api_keys,
            "active_api_keys": active_api_keys,
            "total_submissions": total_submissions,
            "recent_submissions": recent_submissions,
            "total_files": total_files,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        assert_eq!(clamp_pagination(0, 0), (1, 1));
        assert_eq!(clamp_pagination(-5, 2000), (1, 100));
        assert_eq!(clamp_pagination(3, 20), (3, 20));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
    }
}
