//! # Aerie Common Library
//!
//! Shared code for the Aerie collector, classifier and sync client:
//! - Record models and classification status types
//! - Extraction of records from captured timeline payloads
//! - The SQLite-backed record store
//! - Configuration loading and root folder resolution
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod time;

pub use db::Store;
pub use error::{Error, Result};
pub use models::{ClassificationStatus, Record, RecordStatus, StoredRecord};
