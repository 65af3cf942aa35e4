//! Crate-wide error type.
//!
//! A handler returns `AppError`, and the bus consumer loop
//! (`bus::BusConsumer::run`) decides whether to ack-and-drop or leave the
//! message pending based on the variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Database error. Treated as transient: the message is not acked and
    /// the bus redelivers it on the next poll.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bus connection/protocol error. Transient, triggers reconnect+backoff.
    #[error("bus error: {0}")]
    Bus(#[from] redis::RedisError),

    /// Malformed message payload (missing/invalid required field). Logged,
    /// dropped, acked; redelivery would not help.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A gating condition was not met (active orders > 0, empty snapshot,
    /// non-positive budget, ...). Logged, dropped, acked.
    #[error("gating condition not met: {0}")]
    Gated(String),

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// True when the bus should leave the message pending for redelivery
    /// instead of acking it (per the "Transient DB error" / "Bus connection
    /// loss" rows of the error-handling table).
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Bus(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
