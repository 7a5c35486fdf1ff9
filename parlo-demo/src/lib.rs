//! parlo-demo library - pronunciation demo backend
//!
//! Serves the demo flow for the Parlo landing page: access grants, mock
//! pronunciation scoring, lead capture, and the stubbed checkout. The
//! companion `parlo-costs` binary runs the daily cost monitor against the
//! same database.

use axum::Router;
use parlo_common::db::settings::DemoSettings;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod costs;
pub mod db;
pub mod error;
pub mod scoring;
pub mod validate;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Demo tunables loaded from the settings table at startup
    pub settings: DemoSettings,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, settings: DemoSettings) -> Self {
        Self { db, settings }
    }
}

/// Build application router
///
/// The landing page is served from a separate static host, hence the
/// permissive CORS layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::demo::demo_routes())
        .merge(api::pronunciation::pronunciation_routes())
        .merge(api::checkout::checkout_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
