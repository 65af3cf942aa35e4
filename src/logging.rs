//! Tracing setup: stdout + rolling file sink, `log.level`/`log.path` driven.
//!
//! A non-blocking rolling-file writer layered alongside a plain stdout
//! layer, gated by an `EnvFilter` that defaults to the configured level when
//! `RUST_LOG` isn't set.

use crate::config::LogConfig;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maps the configured integer levels (0/10/20/30/40/50, Python `logging`
/// convention) onto `tracing::Level`.
pub fn level_from_int(level: u32) -> Level {
    match level {
        0..=10 => Level::DEBUG,
        11..=20 => Level::INFO,
        21..=30 => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Initializes global tracing. Returns a guard that must be held for the
/// life of the process; dropping it stops the non-blocking file writer.
pub fn init_logging(config: &LogConfig) -> WorkerGuard {
    let log_path = Path::new(&config.path);
    let dir = log_path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = log_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "tradebot.log".to_string());

    let file_appender = tracing_appender::rolling::daily(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let level = level_from_int(config.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tradebot={level}")));

    let file_layer = fmt::layer()
        .with_target(false)
        .with_writer(non_blocking)
        .with_ansi(false);
    let stdout_layer = fmt::layer().with_target(false).with_ansi(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_integer_levels_to_tracing_levels() {
        assert_eq!(level_from_int(0), Level::DEBUG);
        assert_eq!(level_from_int(10), Level::DEBUG);
        assert_eq!(level_from_int(20), Level::INFO);
        assert_eq!(level_from_int(30), Level::WARN);
        assert_eq!(level_from_int(40), Level::ERROR);
        assert_eq!(level_from_int(50), Level::ERROR);
    }
}
