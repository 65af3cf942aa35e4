//! `tradebot-trend-eval`: consumes `requested.trends`, proposes at most one
//! buy order per snapshot via `database.save`.

use clap::Parser;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::Mutex;
use tradebot::bus::redis_bus::{BusConsumer, BusPublisher};
use tradebot::bus::Topic;
use tradebot::config::AppConfig;
use tradebot::daemon::{run_lifecycle, Cli};
use tradebot::logging::init_logging;
use tradebot::metrics;
use tradebot::workers::trend_eval::TrendEvaluator;

const WORKER_NAME: &str = "trend-eval";

fn shutdown_signal() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    let _guard = init_logging(&config.log);

    run_lifecycle(WORKER_NAME, &config.workdir.clone(), cli.command, move || async move {
        metrics::serve(WORKER_NAME, config.metrics.port).await?;

        let publisher = BusPublisher::connect(&config.bus.url).await?;
        let evaluator = Mutex::new(TrendEvaluator::new(publisher, config.buy.trend));

        let consumer = BusConsumer::new(Topic::RequestedTrends, &config.bus.url);
        consumer
            .run(|payload| async { evaluator.lock().await.handle(payload).await }, shutdown_signal())
            .await?;
        Ok(())
    })
    .await
}
