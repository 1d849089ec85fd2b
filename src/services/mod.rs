//! Business logic services.
//!
//! Services contain the submission pipeline, separated from HTTP concerns.

/// Attachment storage (tenant/month bucketing, atomic writes)
pub mod attachment_store;
/// API key validation
pub mod credential;
/// Notification rendering and delivery
pub mod notifier;
/// Form data sanitization
pub mod sanitize;
/// Submission ingestion orchestration
pub mod submission_service;
