//! Public form submission endpoint.
//!
//! `POST /submit/{api_key}` accepts either `multipart/form-data` (fields
//! plus zero or more file parts) or `application/x-www-form-urlencoded`
//! (fields only). The handler stays thin: it parses the body into a
//! `NewSubmission` and hands the pipeline to the submission service.

use axum::{
    extract::{FromRequest, Multipart, Path, RawForm, Request, State, connect_info::ConnectInfo},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::{
    error::AppError,
    response,
    services::submission_service::{self, NewSubmission, SubmissionContext, UploadedFile},
    state::AppState,
};

/// Handle a form submission.
///
/// # Responses
///
/// - **201 Created**: `{"success": true, "data": {"submission_id": "..."}}`
/// - **401**: invalid or inactive API key
/// - **400**: empty payload, or a file with a disallowed extension
/// - **413**: body exceeds the configured maximum upload size
/// - **500**: storage or unexpected failure
///
/// Notification delivery failure still yields 201; the outcome is recorded
/// on the submission record instead.
pub async fn submit_form(
    State(state): State<AppState>,
    Path(api_key): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
) -> Result<Response, AppError> {
    let headers = request.headers().clone();

    let (fields, files) = parse_submission_body(request).await?;

    let input = NewSubmission {
        fields,
        files,
        ip_address: Some(client_ip(&headers, addr)),
        user_agent: user_agent(&headers),
    };

    let ctx = SubmissionContext {
        pool: &state.pool,
        notifier: &state.notifier,
        upload_dir: &state.config.upload_dir,
        allowed_extensions: state.config.allowed_extension_set(),
    };

    let submission_id = submission_service::process_submission(&ctx, &api_key, input).await?;

    Ok(response::success(
        StatusCode::CREATED,
        "Form submitted successfully",
        json!({ "submission_id": submission_id }),
    ))
}

/// Parse the request body into form fields and buffered file parts.
///
/// Multipart bodies may carry files; urlencoded bodies never do. File parts
/// with an empty filename (an empty `<input type="file">`) are ignored,
/// matching common browser behavior.
async fn parse_submission_body(
    request: Request,
) -> Result<(Vec<(String, String)>, Vec<UploadedFile>), AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut fields = Vec::new();
    let mut files = Vec::new();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| AppError::InvalidRequest(e.body_text()))?;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let field_name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(|name| name.to_string());
            let content_type = field.content_type().map(|ct| ct.to_string());
            match file_name {
                Some(file_name) if !file_name.is_empty() => {
                    let contents = field.bytes().await.map_err(multipart_error)?;
                    files.push(UploadedFile {
                        field_name,
                        file_name,
                        content_type,
                        contents,
                    });
                }
                Some(_) => {
                    // Empty file input; drain and drop.
                    let _ = field.bytes().await.map_err(multipart_error)?;
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    fields.push((field_name, value));
                }
            }
        }
    } else {
        let RawForm(bytes) = RawForm::from_request(request, &()).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                AppError::InvalidRequest(e.body_text())
            }
        })?;
        fields = url::form_urlencoded::parse(&bytes).into_owned().collect();
    }

    Ok((fields, files))
}

/// Map a multipart read error, distinguishing the body-size cap.
fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::InvalidRequest(e.body_text())
    }
}

/// Resolve the client IP, honoring proxy headers.
///
/// `X-Forwarded-For` (first hop) wins, then `X-Real-IP`, then the socket
/// peer address. Header values are untrusted, so the result is clamped to
/// the column width.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    let from_headers = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        });

    match from_headers {
        Some(ip) => ip.chars().take(45).collect(),
        None => addr.ip().to_string(),
    }
}

/// Extract the user agent, truncated to the 255-character column width.
fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(255).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "203.0.113.9:443".parse().unwrap()
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.7, 10.0.0.1, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers, peer()), "198.51.100.7");
    }

    #[test]
    fn real_ip_used_when_no_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.8"));
        assert_eq!(client_ip(&headers, peer()), "198.51.100.8");
    }

    #[test]
    fn falls_back_to_peer_address() {
        assert_eq!(client_ip(&HeaderMap::new(), peer()), "203.0.113.9");
    }

    #[test]
    fn header_ip_clamped_to_column_width() {
        let mut headers = HeaderMap::new();
        let junk = "a".repeat(300);
        headers.insert("x-forwarded-for", HeaderValue::from_str(&junk).unwrap());
        assert_eq!(client_ip(&headers, peer()).len(), 45);
    }

    #[test]
    fn user_agent_truncated_to_255_chars() {
        let mut headers = HeaderMap::new();
        let long = "Mozilla/5.0 ".repeat(40);
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&long).unwrap());
        let ua = user_agent(&headers).unwrap();
        assert_eq!(ua.chars().count(), 255);
    }

    #[test]
    fn user_agent_absent_when_header_missing() {
        assert_eq!(user_agent(&HeaderMap::new()), None);
    }
}
