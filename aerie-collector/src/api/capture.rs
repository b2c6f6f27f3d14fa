//! Raw payload capture endpoint
//!
//! The extension can hand over an intercepted timeline response untouched; the
//! collector runs extraction itself. The payload may arrive as JSON or as the
//! response text.

use aerie_common::extract;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub payload: Option<Value>,
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub status: &'static str,
    pub extracted: usize,
    pub inserted: u64,
    pub duplicates: u64,
}

/// POST /capture
pub async fn capture_payload(
    State(state): State<AppState>,
    request: Result<Json<CaptureRequest>, JsonRejection>,
) -> ApiResult<Json<CaptureResponse>> {
    let Json(request) = request?;

    let payload = match request.payload {
        None => {
            return Err(ApiError::BadRequest("Missing 'payload' field".to_string()))
        }
        Some(Value::String(text)) => serde_json::from_str(&text)
            .map_err(|e| ApiError::BadRequest(format!("'payload' is not valid JSON: {}", e)))?,
        Some(value) => value,
    };

    let records = extract::extract(&payload);
    let outcome = state.store.ingest(&records).await?;
    // Records are already committed here
    if let Err(e) = state
        .store
        .record_capture_session(request.source_url.as_deref(), records.len() as u64)
        .await
    {
        warn!(error = %e, "Failed to record capture session");
    }

    info!(
        source_url = request.source_url.as_deref().unwrap_or("-"),
        extracted = records.len(),
        inserted = outcome.inserted,
        duplicates = outcome.duplicates,
        "Captured payload"
    );

    Ok(Json(CaptureResponse {
        status: "ok",
        extracted: records.len(),
        inserted: outcome.inserted,
        duplicates: outcome.duplicates,
    }))
}

pub fn capture_routes() -> Router<AppState> {
    Router::new().route("/capture", post(capture_payload))
}
