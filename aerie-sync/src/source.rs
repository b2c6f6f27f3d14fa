//! Status source abstraction
//!
//! Implemented over HTTP by [`crate::CollectorClient`] and directly by the
//! SQLite [`Store`] for in-process use.

use std::collections::HashMap;

use aerie_common::{ClassificationStatus, RecordStatus, Store};
use async_trait::async_trait;

use crate::error::SyncResult;

/// Answers batched status lookups
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Status per requested id; ids never ingested come back `Unknown`
    async fn check_status(&self, ids: &[String]) -> SyncResult<HashMap<String, RecordStatus>>;

    /// Every record that has left pending
    async fn classified_ids(&self) -> SyncResult<HashMap<String, ClassificationStatus>>;
}

#[async_trait]
impl StatusSource for Store {
    async fn check_status(&self, ids: &[String]) -> SyncResult<HashMap<String, RecordStatus>> {
        Ok(Store::check_status(self, ids).await?)
    }

    async fn classified_ids(&self) -> SyncResult<HashMap<String, ClassificationStatus>> {
        Ok(self.list_classified_ids().await?)
    }
}
