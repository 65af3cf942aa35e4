//! `tradebot-ingest`: pulls the external feed into `database.save`
//! (`FeedPump`) and is the generic `database.save` consumer that performs
//! the actual insert-ignore (`SaveSink`).

use clap::Parser;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tradebot::bus::redis_bus::{BusConsumer, BusPublisher};
use tradebot::bus::Topic;
use tradebot::config::AppConfig;
use tradebot::daemon::{run_lifecycle, Cli};
use tradebot::db::Database;
use tradebot::logging::init_logging;
use tradebot::metrics;
use tradebot::workers::feed::{discover_symbols, WebSocketFeed};
use tradebot::workers::ingest::{FeedPump, SaveSink};

const WORKER_NAME: &str = "ingest";

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
        let symbols = discover_symbols(&config.symbols.path, &config.symbols.mask)?;
        tracing::info!("discovered {} symbols to stream", symbols.len());

        let feed_publisher = BusPublisher::connect(&config.bus.url).await?;
        let feed = WebSocketFeed::new(&config.api.url);
        let pump = FeedPump::new(
            feed,
            feed_publisher,
            config.api.buffer,
            Duration::from_secs(config.api.respawn),
        );

        let sink = SaveSink::new(db);
        let consumer = BusConsumer::new(Topic::DatabaseSave, &config.bus.url);

        let pump_task = tokio::spawn(pump.run(symbols, shutdown_signal()));
        let sink_task = tokio::spawn(async move {
            consumer
                .run(|payload| sink.handle(payload), shutdown_signal())
                .await
        });

        let (pump_result, sink_result) = tokio::try_join!(pump_task, sink_task)?;
        pump_result?;
        sink_result?;
        Ok(())
    })
    .await
}
