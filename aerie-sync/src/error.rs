//! Sync client error types

use thiserror::Error;

pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Failures reaching or reading the status source
///
/// Neither is fatal: the ids involved stay in the retry set and no cached
/// terminal status is touched.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Backend unreachable or answered with a server error
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Backend answered with something that is not a status map
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<aerie_common::Error> for SyncError {
    fn from(err: aerie_common::Error) -> Self {
        SyncError::StoreUnavailable(err.to_string())
    }
}
