//! aerie-collector library interface
//!
//! HTTP front of the record store. The browser extension posts captured
//! records (or raw timeline payloads) here; the classifier and the sync client
//! read statuses back.

pub mod api;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use aerie_common::Store;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Raw timeline payloads run to several megabytes
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// CORS is permissive so the extension can call in from any page origin.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::tweet_routes())
        .merge(api::capture_routes())
        .merge(api::stats_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
