//! Record ingest, status and listing endpoints

use std::collections::HashMap;

use aerie_common::models::IngestOutcome;
use aerie_common::{ClassificationStatus, Record, RecordStatus, StoredRecord};
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{ApiError, ApiResult, AppState};

const DEFAULT_LIST_LIMIT: u32 = 100;

/// Response to POST /tweets
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub received: usize,
    pub inserted: u64,
    pub duplicates: u64,
    /// Elements that could not be read as records
    pub rejected: usize,
}

/// Record listing
#[derive(Debug, Serialize)]
pub struct TweetListResponse {
    pub tweets: Vec<StoredRecord>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApprovedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

#[derive(Debug, Serialize)]
pub struct ApproveAllResponse {
    pub approved: u64,
}

/// Take an array field out of a request body
fn take_array(body: &mut Value, field: &str) -> ApiResult<Vec<Value>> {
    match body.get_mut(field).map(Value::take) {
        None => Err(ApiError::BadRequest(format!("Missing '{}' field", field))),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ApiError::BadRequest(format!("'{}' must be an array", field))),
    }
}

/// POST /tweets
///
/// Body: `{"tweets": [Record, ...]}`. Elements that fail to deserialize (or
/// carry an empty id) are counted as rejected instead of failing the batch.
pub async fn receive_tweets(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<IngestResponse>> {
    let Json(mut body) = payload?;
    let items = take_array(&mut body, "tweets")?;
    let received = items.len();

    let mut records = Vec::with_capacity(received);
    let mut rejected = 0;
    for item in items {
        match serde_json::from_value::<Record>(item) {
            Ok(record) if !record.id.is_empty() => records.push(record),
            Ok(_) => {
                rejected += 1;
                debug!("Rejected record with empty id");
            }
            Err(e) => {
                rejected += 1;
                debug!(error = %e, "Rejected malformed record");
            }
        }
    }

    let IngestOutcome {
        inserted,
        duplicates,
    } = state.store.ingest(&records).await?;

    info!(received, inserted, duplicates, rejected, "Received tweets");

    Ok(Json(IngestResponse {
        status: "ok",
        received,
        inserted,
        duplicates,
        rejected,
    }))
}

/// POST /tweets/check
///
/// Body: `{"ids": ["123", ...]}`. Numeric ids are accepted and rendered in
/// decimal. Returns `{"123": "approved", ...}` with `unknown` for unseen ids.
pub async fn check_tweets(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<HashMap<String, RecordStatus>>> {
    let Json(mut body) = payload?;
    let ids = take_array(&mut body, "ids")?
        .into_iter()
        .map(|id| match id {
            Value::String(s) => Ok(s),
            Value::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
            other => Err(ApiError::BadRequest(format!("Invalid id: {}", other))),
        })
        .collect::<ApiResult<Vec<String>>>()?;

    let statuses = state.store.check_status(&ids).await?;
    debug!(count = ids.len(), "Checked statuses");
    Ok(Json(statuses))
}

/// GET /tweets/classified-ids
///
/// All non-pending ids, for client cache bootstrap.
pub async fn classified_ids(
    State(state): State<AppState>,
) -> ApiResult<Json<HashMap<String, ClassificationStatus>>> {
    Ok(Json(state.store.list_classified_ids().await?))
}

/// GET /tweets/pending?limit=N
pub async fn pending_tweets(
    State(state): State<AppState>,
    query: Result<Query<PendingQuery>, QueryRejection>,
) -> ApiResult<Json<TweetListResponse>> {
    let Query(query) = query?;
    let tweets = state.store.list_pending(query.limit).await?;
    Ok(Json(TweetListResponse {
        count: tweets.len(),
        tweets,
    }))
}

/// GET /tweets/approved?limit=N&offset=M
pub async fn approved_tweets(
    State(state): State<AppState>,
    query: Result<Query<ApprovedQuery>, QueryRejection>,
) -> ApiResult<Json<TweetListResponse>> {
    let Query(query) = query?;
    let tweets = state.store.list_approved(query.limit, query.offset).await?;
    Ok(Json(TweetListResponse {
        count: tweets.len(),
        tweets,
    }))
}

/// POST /tweets/approve-all
///
/// Administrative: approve everything still pending.
pub async fn approve_all(State(state): State<AppState>) -> ApiResult<Json<ApproveAllResponse>> {
    let approved = state.store.approve_all_pending().await?;
    Ok(Json(ApproveAllResponse { approved }))
}

pub fn tweet_routes() -> Router<AppState> {
    Router::new()
        .route("/tweets", post(receive_tweets))
        .route("/tweets/check", post(check_tweets))
        .route("/tweets/classified-ids", get(classified_ids))
        .route("/tweets/pending", get(pending_tweets))
        .route("/tweets/approved", get(approved_tweets))
        .route("/tweets/approve-all", post(approve_all))
}
