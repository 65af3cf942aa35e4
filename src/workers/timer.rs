//! Timer dispatcher: cycles `trends -> orders -> profit -> orders`,
//! persisting the phase index to a small state file. The file is written
//! atomically (write-temp-then-rename) and a corrupt value falls back to
//! phase 0.

use crate::bus::redis_bus::BusPublisher;
use crate::bus::{DatabaseReadMessage, OrdersMakeMessage, SnapshotRequestType, Topic};
use crate::error::AppError;
use std::path::{Path, PathBuf};

const PHASES: [&str; 4] = ["trends", "orders", "profit", "orders"];

/// The `timer-daemon.state` file: an ASCII integer, the phase index `mod 4`.
pub struct PhaseFile {
    path: PathBuf,
}

impl PhaseFile {
    pub fn new(workdir: &str) -> Self {
        Self {
            path: Path::new(workdir).join("timer-daemon.state"),
        }
    }

    pub fn read(&self) -> usize {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&i| i < PHASES.len())
            .unwrap_or(0)
    }

    pub fn write(&self, phase: usize) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, phase.to_string())?;
        std::fs::rename(&tmp, &self.path)
    }
}

/// Advances the phase index and publishes the phase-specific request on
/// each call. The one-shot `timer` binary calls [`tick`](Self::tick) once
/// per invocation; a process supervisor re-invokes it on a fixed interval.
pub struct TimerDispatcher {
    publisher: BusPublisher,
    phase_file: PhaseFile,
    lookahead: i64,
    lookbehind: i64,
}

impl TimerDispatcher {
    pub fn new(publisher: BusPublisher, workdir: &str, lookahead: i64, lookbehind: i64) -> Self {
        Self {
            publisher,
            phase_file: PhaseFile::new(workdir),
            lookahead,
            lookbehind,
        }
    }

    pub async fn tick(&mut self, now: i64) -> Result<(), AppError> {
        let next = (self.phase_file.read() + 1) % PHASES.len();
        self.phase_file.write(next)?;

        match PHASES[next] {
            "trends" => {
                let message = DatabaseReadMessage {
                    request_type: SnapshotRequestType::Trends,
                    stamp: Some(now),
                    params: serde_json::json!({
                        "lookahead": self.lookahead,
                        "lookbehind": self.lookbehind,
                    }),
                };
                self.publisher.publish(Topic::DatabaseRead, &message).await?;
            }
            "profit" => {
                let message = DatabaseReadMessage {
                    request_type: SnapshotRequestType::Profit,
                    stamp: Some(now),
                    params: serde_json::json!({}),
                };
                self.publisher.publish(Topic::DatabaseRead, &message).await?;
            }
            "orders" => {
                let message = OrdersMakeMessage {
                    stamp: Some(now),
                    lookahead: Some(self.lookahead),
                };
                self.publisher.publish(Topic::OrdersMake, &message).await?;
            }
            other => unreachable!("unrecognized phase {other}"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_workdir(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("tradebot-timer-test-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.to_string_lossy().to_string()
    }

    #[test]
    fn rotates_through_four_phases_in_order() {
        let workdir = scratch_workdir("rotation");
        let file = PhaseFile::new(&workdir);

        let mut seen = Vec::new();
        let mut current = file.read();
        for _ in 0..8 {
            current = (current + 1) % PHASES.len();
            file.write(current).unwrap();
            seen.push(PHASES[current]);
        }

        assert_eq!(
            seen,
            ["orders", "profit", "orders", "trends", "orders", "profit", "orders", "trends"]
        );
    }

    #[test]
    fn corrupt_state_file_falls_back_to_phase_zero() {
        let workdir = scratch_workdir("corrupt");
        let file = PhaseFile::new(&workdir);
        std::fs::write(&file.path, "not-a-number").unwrap();
        assert_eq!(file.read(), 0);
    }

    #[test]
    fn out_of_range_index_falls_back_to_phase_zero() {
        let workdir = scratch_workdir("range");
        let file = PhaseFile::new(&workdir);
        std::fs::write(&file.path, "99").unwrap();
        assert_eq!(file.read(), 0);
    }
}
