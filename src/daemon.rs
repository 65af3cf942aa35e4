//! Pidfile-based process lifecycle for the long-running workers:
//! `start | stop | restart`, pidfile at `<workdir>/run/<name>.pid`.
//!
//! No double-fork/session-leader dance, just the pidfile bookkeeping a
//! process supervisor (systemd, runit, ...) needs. Liveness is checked with
//! `libc::kill(pid, 0)` since no crate wraps pidfile management directly.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the INI configuration file.
    #[arg(long, default_value = "config.ini", global = true)]
    pub config: PathBuf,
}

#[derive(Debug, Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Restart,
}

pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(workdir: &str, worker_name: &str) -> Self {
        Self {
            path: Path::new(workdir).join("run").join(format!("{worker_name}.pid")),
        }
    }

    fn read_pid(&self) -> Option<i32> {
        fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }

    /// True if the pidfile names a process that is still alive.
    fn is_live(&self) -> bool {
        match self.read_pid() {
            Some(pid) => unsafe { libc::kill(pid, 0) == 0 },
            None => false,
        }
    }

    fn write_current_pid(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, std::process::id().to_string())?;
        Ok(())
    }

    fn remove(&self) {
        let _ = fs::remove_file(&self.path);
    }

    fn send_sigterm(&self) -> anyhow::Result<()> {
        match self.read_pid() {
            Some(pid) => {
                unsafe { libc::kill(pid, libc::SIGTERM) };
                Ok(())
            }
            None => anyhow::bail!("no pidfile at {}", self.path.display()),
        }
    }
}

/// Runs `body` under the pidfile lifecycle implied by `command`:
/// - `Start`: refuse if a live instance already owns the pidfile, else claim
///   it and run `body` until it returns or the process is signaled.
/// - `Stop`: SIGTERM the pid named in the pidfile and return without
///   running `body`.
/// - `Restart`: `Stop`, wait briefly, then `Start`.
pub async fn run_lifecycle<F, Fut>(
    worker_name: &'static str,
    workdir: &str,
    command: Command,
    body: F,
) -> anyhow::Result<()>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let pidfile = PidFile::new(workdir, worker_name);

    match command {
        Command::Stop => {
            pidfile.send_sigterm()?;
            pidfile.remove();
            Ok(())
        }
        Command::Restart => {
            if pidfile.is_live() {
                let _ = pidfile.send_sigterm();
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            pidfile.remove();
            start(&pidfile, body).await
        }
        Command::Start => start(&pidfile, body).await,
    }
}

async fn start<F, Fut>(pidfile: &PidFile, body: F) -> anyhow::Result<()>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    if pidfile.is_live() {
        anyhow::bail!("{} already running", pidfile.path.display());
    }
    pidfile.write_current_pid()?;
    let result = body().await;
    pidfile.remove();
    result
}
