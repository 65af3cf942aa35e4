//! Ingest worker: buffers streaming trades and periodically emits them to
//! persistence via `database.save`; the companion `SaveSink` is the generic
//! `database.save` consumer that performs the actual insert-ignore, shared
//! by both the ingest worker's own transactions and the evaluators' order
//! proposals.

use crate::bus::redis_bus::BusPublisher;
use crate::bus::{to_table_desc, DatabaseSaveMessage, Topic};
use crate::db::Database;
use crate::error::AppError;
use crate::models::{NewOrder, NewTransaction};
use crate::workers::feed::MarketFeed;
use std::future::Future;
use std::time::Duration;

/// Pulls batches from a [`MarketFeed`], buffers them, and flushes to
/// `database.save` once the buffer crosses `buffer_threshold` or the feed
/// closes. Respawns the feed after `respawn_delay` on close; flushes once
/// more on shutdown.
pub struct FeedPump<F: MarketFeed> {
    feed: F,
    publisher: BusPublisher,
    buffer_threshold: usize,
    respawn_delay: Duration,
}

impl<F: MarketFeed> FeedPump<F> {
    pub fn new(
        feed: F,
        publisher: BusPublisher,
        buffer_threshold: usize,
        respawn_delay: Duration,
    ) -> Self {
        Self {
            feed,
            publisher,
            buffer_threshold,
            respawn_delay,
        }
    }

    pub async fn run(
        mut self,
        symbols: Vec<String>,
        mut shutdown: impl Future<Output = ()> + Unpin,
    ) -> Result<(), AppError> {
        let mut buffer: Vec<NewTransaction> = Vec::new();

        'respawn: loop {
            let mut rx = self.feed.subscribe(&symbols);

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        self.flush(&mut buffer).await?;
                        return Ok(());
                    }
                    batch = rx.recv() => {
                        match batch {
                            Some(records) => {
                                buffer.extend(records.into_iter().map(|r| NewTransaction {
                                    price: r.price,
                                    symbol: r.symbol,
                                    stamp: r.stamp,
                                    volume: r.volume,
                                }));
                                if buffer.len() >= self.buffer_threshold {
                                    self.flush(&mut buffer).await?;
                                }
                            }
                            None => {
                                tracing::warn!(
                                    "feed stream closed, respawning in {:?}",
                                    self.respawn_delay
                                );
                                self.flush(&mut buffer).await?;
                                tokio::time::sleep(self.respawn_delay).await;
                                continue 'respawn;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn flush(&mut self, buffer: &mut Vec<NewTransaction>) -> Result<(), AppError> {
        if buffer.is_empty() {
            return Ok(());
        }

        let table_desc =
            to_table_desc(buffer).map_err(|e| AppError::MalformedMessage(e.to_string()))?;
        let message = DatabaseSaveMessage {
            table_name: "transactions".to_string(),
            table_desc,
        };
        self.publisher.publish(Topic::DatabaseSave, &message).await?;
        buffer.clear();
        Ok(())
    }
}

/// Consumes `database.save` and writes the described rows, insert-ignore,
/// to whichever table `table_name` names.
pub struct SaveSink {
    db: Database,
}

impl SaveSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn handle(&self, payload: String) -> Result<(), AppError> {
        let message: DatabaseSaveMessage = serde_json::from_str(&payload)
            .map_err(|e| AppError::MalformedMessage(e.to_string()))?;

        match message.table_name.as_str() {
            "transactions" => {
                let rows: Vec<NewTransaction> = crate::bus::from_table_desc(&message.table_desc)
                    .map_err(|e| AppError::MalformedMessage(e.to_string()))?;
                crate::db::transactions::insert_ignore_batch(&self.db.pool, &rows).await?;
            }
            "orders" => {
                let rows: Vec<NewOrder> = crate::bus::from_table_desc(&message.table_desc)
                    .map_err(|e| AppError::MalformedMessage(e.to_string()))?;
                crate::db::orders::insert_ignore_batch(&self.db.pool, &rows).await?;
            }
            other => {
                return Err(AppError::MalformedMessage(format!(
                    "unknown table_name {other}"
                )));
            }
        }

        Ok(())
    }
}
