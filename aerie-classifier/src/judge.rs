//! External judgment seam
//!
//! The classification algorithm is opaque to the driver: it hands over the
//! formatted record text and the filter prompt and gets back a verdict.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input for one judgment
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub text: &'a str,
    pub prompt: &'a str,
    pub model: &'a str,
}

/// Outcome of one judgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    pub reason: String,
}

impl Verdict {
    pub fn approve(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
        }
    }

    pub fn filter(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
        }
    }
}

/// Judgment failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JudgeError {
    /// Rate limit, outage or network failure; the rest of the batch waits for the next run
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// The provider refused this record; skip it and carry on
    #[error("Permanent provider error: {0}")]
    Permanent(String),
}

impl JudgeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, JudgeError::Transient(_))
    }
}

/// Produces a verdict for one record
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, request: JudgeRequest<'_>) -> Result<Verdict, JudgeError>;
}
