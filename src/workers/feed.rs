//! The external market-data stream, abstracted behind [`MarketFeed`].
//! `WebSocketFeed` is the real implementation; `MockFeed` is a
//! deterministic stand-in for tests and the mock-data CLI flag.

use crate::error::AppError;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// One observed trade as it arrives on the wire: `{"p","s","t","v"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRecord {
    #[serde(rename = "p")]
    pub price: f64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub stamp: i64,
    #[serde(rename = "v")]
    pub volume: f64,
}

#[derive(Debug, Deserialize)]
struct FeedFrame {
    data: Vec<FeedRecord>,
}

/// A push source of trade batches. `subscribe` spawns the feed's I/O loop
/// and returns a channel; the channel closing signals stream termination,
/// which the ingest worker treats as a respawn trigger.
pub trait MarketFeed: Send + Sync + 'static {
    fn subscribe(&self, symbols: &[String]) -> mpsc::Receiver<Vec<FeedRecord>>;
}

/// `tokio-tungstenite` client: subscribes per symbol, parses
/// `{"data":[...]}` frames.
pub struct WebSocketFeed {
    url: String,
    channel_capacity: usize,
}

impl WebSocketFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel_capacity: 64,
        }
    }
}

impl MarketFeed for WebSocketFeed {
    fn subscribe(&self, symbols: &[String]) -> mpsc::Receiver<Vec<FeedRecord>> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let url = self.url.clone();
        let symbols = symbols.to_vec();

        tokio::spawn(async move {
            let (ws_stream, _) = match tokio_tungstenite::connect_async(&url).await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("feed connect failed: {e}");
                    return;
                }
            };
            let (mut write, mut read) = ws_stream.split();

            for symbol in &symbols {
                let subscribe = serde_json::json!({"type": "subscribe", "symbol": symbol});
                if write.send(WsMessage::Text(subscribe.to_string())).await.is_err() {
                    return;
                }
            }

            while let Some(message) = read.next().await {
                let Ok(WsMessage::Text(text)) = message else {
                    continue;
                };
                match serde_json::from_str::<FeedFrame>(&text) {
                    Ok(frame) => {
                        if tx.send(frame.data).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => tracing::warn!("malformed feed frame: {e}"),
                }
            }
            // Channel drops here, closing `rx`. That's the ingest worker's
            // signal to respawn after `api.respawn`.
        });

        rx
    }
}

/// A scripted, in-memory feed for tests: replays fixed batches on an
/// interval, then closes.
pub struct MockFeed {
    batches: Vec<Vec<FeedRecord>>,
    interval: Duration,
}

impl MockFeed {
    pub fn new(batches: Vec<Vec<FeedRecord>>, interval: Duration) -> Self {
        Self { batches, interval }
    }
}

impl MarketFeed for MockFeed {
    fn subscribe(&self, _symbols: &[String]) -> mpsc::Receiver<Vec<FeedRecord>> {
        let (tx, rx) = mpsc::channel(self.batches.len().max(1));
        let batches = self.batches.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            for batch in batches {
                if tx.send(batch).await.is_err() {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        });

        rx
    }
}

/// Discovers tracked symbols by globbing `symbols.path` with `symbols.mask`:
/// each matched file is JSON containing at least a `symbol` field.
pub fn discover_symbols(path: &str, mask: &str) -> Result<Vec<String>, AppError> {
    let pattern = Path::new(path).join(mask);
    let pattern = pattern.to_string_lossy();

    let mut symbols = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| AppError::Other(e.to_string()))? {
        let path = entry.map_err(|e| AppError::Other(e.to_string()))?;
        let content = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| AppError::MalformedMessage(format!("{}: {e}", path.display())))?;
        if let Some(symbol) = value.get("symbol").and_then(|s| s.as_str()) {
            symbols.push(symbol.to_string());
        }
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_feed_replays_batches_then_closes() {
        let batches = vec![
            vec![FeedRecord { price: 100.0, symbol: "AAA".into(), stamp: 0, volume: 1.0 }],
            vec![FeedRecord { price: 101.0, symbol: "AAA".into(), stamp: 1, volume: 1.0 }],
        ];
        let feed = MockFeed::new(batches, Duration::from_millis(1));
        let mut rx = feed.subscribe(&["AAA".to_string()]);

        let first = rx.recv().await.expect("first batch");
        assert_eq!(first[0].price, 100.0);
        let second = rx.recv().await.expect("second batch");
        assert_eq!(second[0].price, 101.0);
        assert!(rx.recv().await.is_none());
    }
}
