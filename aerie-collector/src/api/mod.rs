//! HTTP API handlers for aerie-collector

pub mod capture;
pub mod health;
pub mod stats;
pub mod tweets;

pub use capture::capture_routes;
pub use health::health_routes;
pub use stats::stats_routes;
pub use tweets::tweet_routes;
