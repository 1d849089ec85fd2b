//! Notification rendering and delivery.
//!
//! Renders a tenant-facing notification (HTML + plain text) for an accepted
//! submission and delivers it over one of two transports:
//!
//! - **Resend** (HTTP API): used whenever `RESEND_API_KEY` is configured.
//!   Attachment contents are base64-encoded into the request.
//! - **SMTP**: used when no Resend key is present. Both body variants plus
//!   the raw files go out as a multipart message.
//!
//! The transport is chosen once, at construction, from configuration
//! presence. A failed send never falls back to the other transport and
//! never becomes a request error: delivery always returns a
//! [`DeliveryOutcome`] that the orchestrator records on the submission row.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, Message, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde_json::{Map, Value, json};
use std::time::Duration;

use crate::config::Config;
use crate::models::attachment::Attachment;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Outbound send timeout. Both transports enforce it so a hung remote
/// endpoint cannot pin a worker indefinitely.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one delivery attempt. Never an error type: the orchestrator
/// records this on the submission and carries on.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub delivered: bool,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    fn delivered() -> Self {
        Self {
            delivered: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            delivered: false,
            error: Some(error),
        }
    }
}

/// The transport selected at startup.
enum Transport {
    Resend { api_key: String },
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
    },
}

/// Notification dispatcher, constructed once and shared across requests.
pub struct Notifier {
    from_name: String,
    from_email: String,
    app_url: String,
    client: reqwest::Client,
    transport: Transport,
}

impl Notifier {
    /// Build the dispatcher from configuration.
    ///
    /// Presence of `resend_api_key` selects the Resend transport; otherwise
    /// SMTP is used. This is a static per-deployment choice, not a runtime
    /// retry chain.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = match &config.resend_api_key {
            Some(key) if !key.is_empty() => {
                tracing::info!("Notification transport: Resend API");
                Transport::Resend {
                    api_key: key.clone(),
                }
            }
            _ => {
                tracing::info!(
                    "Notification transport: SMTP via {}:{}",
                    config.smtp_host,
                    config.smtp_port
                );
                Transport::Smtp {
                    host: config.smtp_host.clone(),
                    port: config.smtp_port,
                    username: config.smtp_username.clone(),
                    password: config.smtp_password.clone(),
                }
            }
        };

        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;

        Ok(Self {
            from_name: config.smtp_from_name.clone(),
            from_email: config.smtp_from_email.clone(),
            app_url: config.app_url.clone(),
            client,
            transport,
        })
    }

    /// Render and deliver the notification for one accepted submission.
    ///
    /// Delivery failure is reported in the outcome, never raised: a lost
    /// email must not roll back the otherwise-successful submission.
    pub async fn send_submission_notification(
        &self,
        recipient: &str,
        api_key_name: &str,
        form_data: &Map<String, Value>,
        files: &[Attachment],
    ) -> DeliveryOutcome {
        let subject = format!("New Form Submission - {api_key_name}");

        let outcome = match &self.transport {
            Transport::Resend { api_key } => {
                self.warm_up().await;
                self.send_via_resend(api_key, recipient, &subject, api_key_name, form_data, files)
                    .await
            }
            Transport::Smtp {
                host,
                port,
                username,
                password,
            } => {
                match self
                    .send_via_smtp(
                        host, *port, username, password, recipient, &subject, api_key_name,
                        form_data, files,
                    )
                    .await
                {
                    Ok(()) => DeliveryOutcome::delivered(),
                    Err(e) => DeliveryOutcome::failed(format!("Failed to send email: {e}")),
                }
            }
        };

        match &outcome {
            DeliveryOutcome {
                delivered: true, ..
            } => tracing::info!("Notification sent to {recipient}"),
            DeliveryOutcome {
                error: Some(error), ..
            } => tracing::error!("Notification to {recipient} failed: {error}"),
            _ => {}
        }

        outcome
    }

    /// Cheap reachability probe ahead of the real send, to pay connection
    /// setup cost before the payload goes out. Failure is logged and never
    /// blocks the actual send attempt.
    async fn warm_up(&self) {
        let probe = self
            .client
            .head(RESEND_ENDPOINT)
            .timeout(Duration::from_secs(5))
            .send()
            .await;
        if let Err(e) = probe {
            tracing::debug!("Warm-up probe failed (continuing with send): {e}");
        }
    }

    async fn send_via_resend(
        &self,
        api_key: &str,
        recipient: &str,
        subject: &str,
        api_key_name: &str,
        form_data: &Map<String, Value>,
        files: &[Attachment],
    ) -> DeliveryOutcome {
        let mut payload = json!({
            "from": format!("{} <{}>", self.from_name, self.from_email),
            "to": [recipient],
            "subject": subject,
            "html": render_html_body(api_key_name, form_data, files, &self.app_url),
        });

        // Attach full file contents for every file that still exists on
        // disk at send time. A missing file is logged and skipped, not
        // fatal to the whole send.
        let mut attachments = Vec::new();
        for file in files {
            match tokio::fs::read(&file.file_path).await {
                Ok(bytes) => attachments.push(json!({
                    "filename": file.original_filename,
                    "content": BASE64.encode(bytes),
                })),
                Err(e) => tracing::warn!(
                    "Skipping attachment {} (unreadable at send time): {e}",
                    file.original_filename
                ),
            }
        }
        if !attachments.is_empty() {
            payload["attachments"] = Value::Array(attachments);
        }

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => DeliveryOutcome::delivered(),
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                DeliveryOutcome::failed(format!("Resend API error: {status} - {body}"))
            }
            Err(e) => DeliveryOutcome::failed(format!("Resend request failed: {e}")),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_via_smtp(
        &self,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        recipient: &str,
        subject: &str,
        api_key_name: &str,
        form_data: &Map<String, Value>,
        files: &[Attachment],
    ) -> anyhow::Result<()> {
        let from: Mailbox = format!("{} <{}>", self.from_name, self.from_email).parse()?;
        let to: Mailbox = recipient.parse()?;

        let text = render_text_body(api_key_name, form_data, files, &self.app_url);
        let html = render_html_body(api_key_name, form_data, files, &self.app_url);

        let mut body =
            MultiPart::mixed().multipart(MultiPart::alternative_plain_html(text, html));
        for file in files {
            match tokio::fs::read(&file.file_path).await {
                Ok(bytes) => {
                    let content_type = file
                        .mime_type
                        .as_deref()
                        .and_then(|m| ContentType::parse(m).ok())
                        .unwrap_or_else(|| {
                            ContentType::parse("application/octet-stream")
                                .expect("static MIME type is valid")
                        });
                    body = body.singlepart(
                        MailAttachment::new(file.original_filename.clone())
                            .body(bytes, content_type),
                    );
                }
                Err(e) => tracing::warn!(
                    "Skipping attachment {} (unreadable at send time): {e}",
                    file.original_filename
                ),
            }
        }

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(body)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .timeout(Some(SEND_TIMEOUT));
        if !username.is_empty() {
            builder = builder.credentials(Credentials::new(
                username.to_string(),
                password.to_string(),
            ));
        }
        let mailer = builder.build();

        mailer.send(message).await?;
        Ok(())
    }
}

/// Format a byte count for humans: 1024-based, one decimal place, B..TB.
pub fn format_file_size(size_bytes: i64) -> String {
    let mut size = size_bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

/// Escape a string for embedding in HTML text or attribute content.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render a form value for display. Values are normally strings; anything
/// else falls back to its JSON representation.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render the HTML notification body.
///
/// The HTML and plain-text renderings must enumerate the same fields and
/// attachments; plain text is the accessible fallback for the same content,
/// not a shorter summary.
pub fn render_html_body(
    api_key_name: &str,
    form_data: &Map<String, Value>,
    files: &[Attachment],
    app_url: &str,
) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<style>\n\
         body {{ font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif;\n\
                 line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}\n\
         .header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white;\n\
                    padding: 30px; border-radius: 10px 10px 0 0; text-align: center; }}\n\
         .content {{ background: #f8f9fa; padding: 30px; border-radius: 0 0 10px 10px; }}\n\
         .field {{ background: white; padding: 15px; margin-bottom: 15px;\n\
                   border-radius: 5px; border-left: 4px solid #667eea; }}\n\
         .field-label {{ font-weight: 600; color: #667eea; font-size: 12px;\n\
                         text-transform: uppercase; margin-bottom: 5px; }}\n\
         .field-value {{ color: #333; font-size: 14px; word-wrap: break-word; }}\n\
         .file-item {{ background: white; padding: 10px 15px; margin-bottom: 10px; border-radius: 5px; }}\n\
         .footer {{ text-align: center; margin-top: 30px; padding-top: 20px;\n\
                    border-top: 1px solid #ddd; color: #666; font-size: 12px; }}\n\
         </style>\n</head>\n<body>\n\
         <div class=\"header\">\n<h1>New Form Submission</h1>\n<p>From: {}</p>\n</div>\n\
         <div class=\"content\">\n",
        escape_html(api_key_name)
    );

    for (key, value) in form_data {
        html.push_str(&format!(
            "<div class=\"field\">\n\
             <div class=\"field-label\">{}</div>\n\
             <div class=\"field-value\">{}</div>\n\
             </div>\n",
            escape_html(key),
            escape_html(&display_value(value)),
        ));
    }

    if !files.is_empty() {
        html.push_str("<div class=\"files\">\n<h3>Attached Files</h3>\n");
        for file in files {
            html.push_str(&format!(
                "<div class=\"file-item\"><strong>{}</strong> ({})</div>\n",
                escape_html(&file.original_filename),
                format_file_size(file.file_size),
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str(&format!(
        "</div>\n<div class=\"footer\">\n\
         <p>This email was sent from your Form Service API</p>\n\
         <p><a href=\"{}\">View Dashboard</a></p>\n\
         </div>\n</body>\n</html>\n",
        escape_html(app_url)
    ));

    html
}

/// Render the plain-text notification body. Carries exactly the same field
/// and attachment data as the HTML rendering.
pub fn render_text_body(
    api_key_name: &str,
    form_data: &Map<String, Value>,
    files: &[Attachment],
    app_url: &str,
) -> String {
    let rule = "-".repeat(50);
    let mut text = format!("New Form Submission\nFrom: {api_key_name}\n{rule}\n\n");

    for (key, value) in form_data {
        text.push_str(&format!("{key}:\n{}\n\n", display_value(value)));
    }

    if !files.is_empty() {
        text.push_str(&format!("\nAttached Files ({}):\n", files.len()));
        for file in files {
            text.push_str(&format!(
                "- {} ({})\n",
                file.original_filename,
                format_file_size(file.file_size),
            ));
        }
    }

    text.push_str(&format!("\n{rule}\nView dashboard: {app_url}\n"));

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn attachment(name: &str, size: i64) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            submission_id: Uuid::new_v4(),
            original_filename: name.to_string(),
            stored_filename: format!("20250101_000000_0011223344556677_{name}"),
            file_path: format!("/tmp/uploads/{name}"),
            file_size: size,
            mime_type: Some("application/pdf".to_string()),
            created_at: Utc::now(),
        }
    }

    fn sample_data() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String("Alice".to_string()));
        map.insert("email".to_string(), Value::String("a@x.com".to_string()));
        map.insert(
            "message".to_string(),
            Value::String("Hello from the form".to_string()),
        );
        map
    }

    #[test]
    fn formats_sizes_with_binary_units() {
        assert_eq!(format_file_size(0), "0.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_073_741_824), "1.0 GB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_file_size(2_199_023_255_552), "2.0 TB");
    }

    #[test]
    fn html_and_text_carry_the_same_fields() {
        let data = sample_data();
        let files = vec![attachment("report.pdf", 2048)];
        let html = render_html_body("Acme Forms", &data, &files, "https://forms.example.com");
        let text = render_text_body("Acme Forms", &data, &files, "https://forms.example.com");

        for (key, value) in &data {
            let value = value.as_str().unwrap();
            assert!(html.contains(key), "HTML missing label {key}");
            assert!(html.contains(value), "HTML missing value {value}");
            assert!(text.contains(key), "text missing label {key}");
            assert!(text.contains(value), "text missing value {value}");
        }
        assert!(html.contains("report.pdf"));
        assert!(text.contains("report.pdf"));
        assert!(html.contains("2.0 KB"));
        assert!(text.contains("2.0 KB"));
    }

    #[test]
    fn html_escapes_field_content() {
        let mut data = Map::new();
        data.insert(
            "comment".to_string(),
            Value::String("<script>alert('x')</script>".to_string()),
        );
        let html = render_html_body("Tenant", &data, &[], "http://localhost:3000");
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn text_body_links_the_dashboard() {
        let text = render_text_body("Tenant", &sample_data(), &[], "https://forms.example.com");
        assert!(text.contains("View dashboard: https://forms.example.com"));
    }

    #[test]
    fn attachment_sections_omitted_without_files() {
        let html = render_html_body("Tenant", &sample_data(), &[], "http://localhost:3000");
        let text = render_text_body("Tenant", &sample_data(), &[], "http://localhost:3000");
        assert!(!html.contains("Attached Files"));
        assert!(!text.contains("Attached Files"));
    }
}
