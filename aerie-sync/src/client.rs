//! HTTP status source backed by aerie-collector
//!
//! Uses `POST /tweets/check` for batched lookups and
//! `GET /tweets/classified-ids` for the bootstrap snapshot.

use std::collections::HashMap;
use std::time::Duration;

use aerie_common::config::SyncConfig;
use aerie_common::{ClassificationStatus, RecordStatus};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::source::StatusSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    ids: &'a [String],
}

/// Collector HTTP client
pub struct CollectorClient {
    client: Client,
    base_url: String,
}

impl CollectorClient {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("aerie-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SyncConfig) -> reqwest::Result<Self> {
        Self::new(&config.collector_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status.as_u16(), body.trim());
            return Err(if status.is_server_error() {
                SyncError::StoreUnavailable(message)
            } else {
                SyncError::InvalidResponse(message)
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl StatusSource for CollectorClient {
    async fn check_status(&self, ids: &[String]) -> SyncResult<HashMap<String, RecordStatus>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(count = ids.len(), "Checking status batch");
        let response = self
            .client
            .post(format!("{}/tweets/check", self.base_url))
            .json(&CheckRequest { ids })
            .send()
            .await
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;

        Self::read_json(response).await
    }

    async fn classified_ids(&self) -> SyncResult<HashMap<String, ClassificationStatus>> {
        let response = self
            .client
            .get(format!("{}/tweets/classified-ids", self.base_url))
            .send()
            .await
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;

        Self::read_json(response).await
    }
}
