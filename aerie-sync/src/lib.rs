//! # Aerie Sync
//!
//! Client-side reconciliation between the handles a host renders and the
//! classification status the collector holds for each record.
//!
//! Handles come and go at the host's whim; everything here is keyed by record
//! id. A [`SyncCache`] remembers what each id resolved to for the session and
//! which ids still need asking, and a [`SyncEngine`] drives it from host change
//! notifications and a retry timer, batching lookups against a
//! [`StatusSource`].

pub mod cache;
pub mod client;
pub mod engine;
pub mod error;
pub mod host;
pub mod source;

pub use cache::SyncCache;
pub use client::CollectorClient;
pub use engine::{
    change_channel, ChangeNotifier, ChangeReceiver, SyncEngine, SyncStats, MIN_RETRY_INTERVAL,
};
pub use error::{SyncError, SyncResult};
pub use host::HandleHost;
pub use source::StatusSource;
