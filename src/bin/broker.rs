//! `tradebot-broker`: consumes `orders.make`, matches pending orders against
//! market transactions under the in-process advisory lock.

use clap::Parser;
use std::future::Future;
use std::pin::Pin;
use tradebot::bus::redis_bus::BusConsumer;
use tradebot::bus::{OrdersMakeMessage, Topic};
use tradebot::config::AppConfig;
use tradebot::daemon::{run_lifecycle, Cli};
use tradebot::db::Database;
use tradebot::error::AppError;
use tradebot::logging::init_logging;
use tradebot::metrics;
use tradebot::workers::broker::BrokerEngine;

const WORKER_NAME: &str = "broker";

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
        let engine = BrokerEngine::new(
            db,
            config.broker.budget,
            config.broker.reserve,
            config.broker.commission,
        );
        let default_lookahead = config.orders.lookahead;

        let consumer = BusConsumer::new(Topic::OrdersMake, &config.bus.url);
        consumer
            .run(
                |payload| async {
                    let request: OrdersMakeMessage = serde_json::from_str(&payload)
                        .map_err(|e| AppError::MalformedMessage(e.to_string()))?;
                    let stamp = request.stamp.unwrap_or_else(tradebot::now_ms);
                    let lookahead = request.lookahead.unwrap_or(default_lookahead);
                    engine.invoke(stamp, lookahead).await
                },
                shutdown_signal(),
            )
            .await?;
        Ok(())
    })
    .await
}
