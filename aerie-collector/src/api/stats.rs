//! Store statistics endpoint

use aerie_common::models::StoreStats;
use axum::{extract::State, routing::get, Json, Router};

use crate::{ApiResult, AppState};

/// GET /stats
///
/// Record counts per classification status.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StoreStats>> {
    Ok(Json(state.store.stats().await?))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}
