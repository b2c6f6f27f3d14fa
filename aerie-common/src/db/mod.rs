//! Database layer: schema initialization, lock-retry helper and the record store

pub mod init;
pub mod records;
pub mod retry;

pub use init::init_database;
pub use records::{SetClassification, Store};
pub use retry::retry_on_lock;
