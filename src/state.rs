//! Shared application state.

use std::sync::Arc;

use crate::{config::Config, db::DbPool, services::notifier::Notifier};

/// State shared with every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub notifier: Arc<Notifier>,
}
