//! Automated trading controller: trend-entry / profit-exit pipeline over a
//! simulated broker.

pub mod bus;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod regression;
pub mod threshold;
pub mod workers;

/// Milliseconds since the Unix epoch, UTC. This is the `stamp` unit used
/// throughout the store.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
