//! aerie-classifier library interface
//!
//! Pulls pending records from the store, asks a [`Judge`] for a verdict on
//! each, and writes the verdicts back.

pub mod anthropic;
pub mod driver;
pub mod judge;
pub mod prompt;
pub mod verdict;

pub use anthropic::AnthropicJudge;
pub use driver::{ClassificationDriver, DriverError, RunOptions, RunSummary};
pub use judge::{Judge, JudgeError, JudgeRequest, Verdict};
