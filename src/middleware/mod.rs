//! Custom middleware for request processing.
//!
//! Middleware functions run before route handlers and can:
//! - Authenticate requests
//! - Inject context into requests
//! - Reject invalid requests early

/// Admin bearer-token authentication middleware
pub mod auth;
