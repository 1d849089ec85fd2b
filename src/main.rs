//! Form Intake Gateway - Main Application Entry Point
//!
//! A multi-tenant form-intake service: external clients POST form data (plus
//! optional file attachments) against a per-tenant API key; the service
//! persists the submission, stores the files, and emails a notification to
//! the tenant's configured recipient. An authenticated admin surface manages
//! API keys, reviews submissions, and downloads files.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: per-tenant API keys (public submit) + JWT (admin)
//! - **Notifications**: Resend HTTP API, or SMTP when no Resend key is set
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Prepare the upload directory and bootstrap the default admin
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port (plus the optional keep-alive task)

mod config;
mod db;
mod error;
mod handlers;
mod keep_alive;
mod middleware;
mod models;
mod response;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::{services::notifier::Notifier, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let mut config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Prepare the upload root and pin it to an absolute path, so attachment
    // rows always record absolute storage paths.
    std::fs::create_dir_all(&config.upload_dir)?;
    config.upload_dir = std::fs::canonicalize(&config.upload_dir)?;
    tracing::info!("Upload directory: {}", config.upload_dir.display());

    // Make sure a fresh deployment has an admin login
    db::ensure_default_admin(&pool, &config.admin_email, &config.admin_password).await?;

    let max_upload_bytes = config.max_upload_bytes;
    let keep_alive_enabled = config.keep_alive;
    let app_url = config.app_url.clone();
    let server_port = config.server_port;

    let notifier = Notifier::from_config(&config)?;
    let state = AppState {
        pool,
        config: Arc::new(config),
        notifier: Arc::new(notifier),
    };

    // Admin routes (JWT bearer token required)
    let admin_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        // API key management
        .route("/api/keys", get(handlers::api_keys::list_api_keys))
        .route("/api/keys", post(handlers::api_keys::create_api_key))
        .route("/api/keys/{id}", put(handlers::api_keys::update_api_key))
        .route(
            "/api/keys/{id}",
            delete(handlers::api_keys::delete_api_key),
        )
        // Submission review
        .route(
            "/api/submissions",
            get(handlers::submissions::list_submissions),
        )
        .route(
            "/api/submissions/{id}",
            get(handlers::submissions::get_submission),
        )
        .route(
            "/api/submissions/{id}",
            delete(handlers::submissions::delete_submission),
        )
        .route(
            "/api/files/{id}/download",
            get(handlers::submissions::download_file),
        )
        .route("/api/stats", get(handlers::submissions::get_stats))
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    // Public ingestion route, with the upload size cap applied before the
    // body is buffered
    let submit_route = Router::new()
        .route("/submit/{api_key}", post(handlers::submit::submit_form))
        .layer(DefaultBodyLimit::max(max_upload_bytes));

    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/login", post(handlers::auth::login))
        .merge(submit_route)
        .merge(admin_routes)
        // Forms post from arbitrary origins, so CORS stays open
        .layer(CorsLayer::permissive())
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state);

    // Optional self-ping task for hosts that sleep idle services
    if keep_alive_enabled {
        keep_alive::spawn(app_url);
    }

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{server_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests; ConnectInfo supplies peer addresses for
    // submitter IP logging
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
