//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Admin user model
pub mod admin_user;
/// Tenant API key model
pub mod api_key;
/// Stored attachment model
pub mod attachment;
/// Form submission model
pub mod submission;
