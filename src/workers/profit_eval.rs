//! Profit evaluator: proposes sell orders for portfolio holdings whose
//! current sale price clears a configured margin after cooldown.

use crate::bus::redis_bus::BusPublisher;
use crate::bus::{to_table_desc, DatabaseSaveMessage, Topic};
use crate::error::AppError;
use crate::models::{NewOrder, ProfitSnapshot};
use crate::threshold::Threshold;

/// Evaluates one profit snapshot, returning the sell orders to propose.
/// `Err(AppError::Gated(_))` signals a gating condition that should be
/// logged, dropped and acked rather than retried.
pub fn evaluate(
    snapshot: &ProfitSnapshot,
    cooldown_seconds: i64,
    margin: Threshold,
    now: i64,
) -> Result<Vec<NewOrder>, AppError> {
    if snapshot.active_orders > 0 {
        return Err(AppError::Gated("active orders pending".to_string()));
    }
    if snapshot.portfolio.is_empty() {
        return Err(AppError::Gated("empty portfolio".to_string()));
    }

    let mut orders = Vec::new();

    for row in &snapshot.portfolio {
        let Some(price_row) = snapshot.prices.get(&row.symbol) else {
            continue;
        };

        if row.buy_stamp + cooldown_seconds * 1000 >= now {
            continue; // not held long enough
        }

        let cogs = row.buy_value + row.commission;
        let sales = price_row.price * row.held_quantity;
        let margin_fraction = (sales - cogs) / sales;

        if margin.accepts_inclusive(sales - cogs, margin_fraction) {
            orders.push(NewOrder {
                price: price_row.price,
                symbol: row.symbol.clone(),
                stamp: now,
                volume: row.held_quantity,
            });
        }
    }

    Ok(orders)
}

/// Wraps [`evaluate`] as a `database.read`-triggered bus handler, batching
/// every accepted sell into one `database.save` message.
pub struct ProfitEvaluator {
    publisher: BusPublisher,
    cooldown_seconds: i64,
    margin: Threshold,
}

impl ProfitEvaluator {
    pub fn new(publisher: BusPublisher, cooldown_seconds: i64, margin: Threshold) -> Self {
        Self {
            publisher,
            cooldown_seconds,
            margin,
        }
    }

    pub async fn handle(&mut self, payload: String) -> Result<(), AppError> {
        let snapshot: ProfitSnapshot = serde_json::from_str(&payload)
            .map_err(|e| AppError::MalformedMessage(e.to_string()))?;

        let orders = evaluate(&snapshot, self.cooldown_seconds, self.margin, snapshot.stamp)?;
        if orders.is_empty() {
            return Ok(());
        }

        let table_desc =
            to_table_desc(&orders).map_err(|e| AppError::MalformedMessage(e.to_string()))?;
        let message = DatabaseSaveMessage {
            table_name: "orders".to_string(),
            table_desc,
        };
        self.publisher.publish(Topic::DatabaseSave, &message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Budget, PortfolioRow, PriceRow};
    use std::collections::HashMap;

    fn snapshot(buy_stamp: i64, held_quantity: f64, buy_value: f64, price: f64) -> ProfitSnapshot {
        let mut prices = HashMap::new();
        prices.insert("AAA".to_string(), PriceRow { price, stamp: 0 });

        ProfitSnapshot {
            active_orders: 0,
            budget: Budget::default(),
            portfolio: vec![PortfolioRow {
                symbol: "AAA".to_string(),
                commission: 0.0,
                buy_value,
                held_quantity,
                buy_stamp,
            }],
            prices,
            stamp: 0,
        }
    }

    #[test]
    fn cooldown_suppresses_recent_buys() {
        let snap = snapshot(0, 10.0, 1_000.0, 120.0);
        let orders = evaluate(&snap, 3600, Threshold::parse("0%"), 100 * 1000).expect("ok");
        assert!(orders.is_empty());
    }

    #[test]
    fn emits_sell_once_cooldown_clears_and_margin_met() {
        let snap = snapshot(0, 10.0, 1_000.0, 120.0);
        let orders = evaluate(&snap, 0, Threshold::parse("10%"), 100_000).expect("ok");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].volume, 10.0);
        assert_eq!(orders[0].price, 120.0);
    }

    #[test]
    fn skips_row_with_no_matching_price() {
        let mut snap = snapshot(0, 10.0, 1_000.0, 120.0);
        snap.prices.clear();
        let orders = evaluate(&snap, 0, Threshold::parse("0%"), 100_000).expect("ok");
        assert!(orders.is_empty());
    }
}
