//! `tradebot-query`: consumes `database.read`, replies on `requested.profit`
//! or `requested.trends`.

use clap::Parser;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::Mutex;
use tradebot::bus::redis_bus::{BusConsumer, BusPublisher};
use tradebot::bus::Topic;
use tradebot::config::AppConfig;
use tradebot::daemon::{run_lifecycle, Cli};
use tradebot::db::Database;
use tradebot::logging::init_logging;
use tradebot::metrics;
use tradebot::workers::query::QueryWorker;

const WORKER_NAME: &str = "query";

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

        let db = Database::connect(&config.db.url()).await?;
        let publisher = BusPublisher::connect(&config.bus.url).await?;
        let worker = Mutex::new(QueryWorker::new(
            db,
            publisher,
            config.broker.budget,
            config.orders.lookahead,
            config.orders.lookbehind,
        ));

        let consumer = BusConsumer::new(Topic::DatabaseRead, &config.bus.url);
        consumer
            .run(|payload| async { worker.lock().await.handle(payload).await }, shutdown_signal())
            .await?;
        Ok(())
    })
    .await
}
