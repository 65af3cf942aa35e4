//! `tradebot-timer`: a one-shot script, re-invoked on a fixed interval by an
//! external scheduler (cron, systemd timer, ...) rather than running as a
//! long-lived daemon. Unlike the other five binaries it takes no
//! `start|stop|restart` subcommand.

use clap::Parser;
use std::path::PathBuf;
use tradebot::bus::redis_bus::BusPublisher;
use tradebot::config::AppConfig;
use tradebot::logging::init_logging;
use tradebot::workers::timer::TimerDispatcher;

#[derive(Debug, Parser)]
struct TimerCli {
    #[arg(long, default_value = "config.ini")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = TimerCli::parse();
    let config = AppConfig::load(&cli.config)?;
    let _guard = init_logging(&config.log);

    let publisher = BusPublisher::connect(&config.bus.url).await?;
    let mut dispatcher = TimerDispatcher::new(
        publisher,
        &config.workdir,
        config.orders.lookahead,
        config.orders.lookbehind,
    );

    dispatcher.tick(tradebot::now_ms()).await?;
    Ok(())
}
