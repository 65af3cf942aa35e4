//! Query worker: consumes `database.read`, assembles a profit or trends
//! snapshot, and publishes it back on the matching reply topic.

use crate::bus::redis_bus::BusPublisher;
use crate::bus::{DatabaseReadMessage, SnapshotRequestType, Topic};
use crate::db::{queries, Database};
use crate::error::AppError;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct TrendParams {
    lookahead: Option<i64>,
    lookbehind: Option<i64>,
}

pub struct QueryWorker {
    db: Database,
    publisher: BusPublisher,
    default_budget: f64,
    default_lookahead: i64,
    default_lookbehind: i64,
}

impl QueryWorker {
    pub fn new(
        db: Database,
        publisher: BusPublisher,
        default_budget: f64,
        default_lookahead: i64,
        default_lookbehind: i64,
    ) -> Self {
        Self {
            db,
            publisher,
            default_budget,
            default_lookahead,
            default_lookbehind,
        }
    }

    pub async fn handle(&mut self, payload: String) -> Result<(), AppError> {
        let request: DatabaseReadMessage = serde_json::from_str(&payload)
            .map_err(|e| AppError::MalformedMessage(e.to_string()))?;
        let stamp = request.stamp.unwrap_or_else(crate::now_ms);

        match request.request_type {
            SnapshotRequestType::Profit => {
                let snapshot =
                    queries::profit_snapshot(&self.db.pool, stamp, self.default_budget).await?;
                self.publisher.publish(Topic::RequestedProfit, &snapshot).await?;
            }
            SnapshotRequestType::Trends => {
                let params: TrendParams =
                    serde_json::from_value(request.params).unwrap_or_default();
                let lookahead = params.lookahead.unwrap_or(self.default_lookahead);
                let lookbehind = params.lookbehind.unwrap_or(self.default_lookbehind);
                let snapshot = queries::trends_snapshot(
                    &self.db.pool,
                    stamp,
                    lookahead,
                    lookbehind,
                    self.default_budget,
                )
                .await?;
                self.publisher.publish(Topic::RequestedTrends, &snapshot).await?;
            }
        }

        Ok(())
    }
}
