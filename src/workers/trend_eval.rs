//! Trend evaluator: fits a per-symbol OLS trend and proposes at most one
//! buy order per snapshot, allocating the whole budget to the best
//! candidate.

use crate::bus::redis_bus::BusPublisher;
use crate::bus::{to_table_desc, DatabaseSaveMessage, Topic};
use crate::error::AppError;
use crate::models::{NewOrder, Transaction, TrendSnapshot};
use crate::regression::ols_fit;
use crate::threshold::Threshold;
use std::collections::HashMap;

const HOUR_MS: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    absolute_trend: f64,
    relative_trend: f64,
    last_price: f64,
}

impl Candidate {
    fn score(&self, threshold: Threshold) -> f64 {
        match threshold {
            Threshold::Fixed(_) => self.absolute_trend,
            Threshold::Percent(_) => self.relative_trend,
        }
    }
}

/// Evaluates one trend snapshot, returning at most one proposed buy order.
/// An `Err(AppError::Gated(_))` signals a gating condition that should be
/// logged, dropped and acked rather than retried.
pub fn evaluate(
    snapshot: &TrendSnapshot,
    threshold: Threshold,
    now: i64,
) -> Result<Option<NewOrder>, AppError> {
    if snapshot.active_orders > 0 {
        return Err(AppError::Gated("active orders pending".to_string()));
    }
    if snapshot.budget.amount <= 0.0 {
        return Err(AppError::Gated("non-positive budget".to_string()));
    }
    if snapshot.transactions.is_empty() {
        return Err(AppError::Gated("empty transaction window".to_string()));
    }

    let mut by_symbol: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for t in &snapshot.transactions {
        by_symbol.entry(t.symbol.as_str()).or_default().push(t);
    }

    // Deterministic iteration order so "first encountered" tie-breaks are
    // reproducible rather than depending on hash iteration order.
    let mut symbols: Vec<&str> = by_symbol.keys().copied().collect();
    symbols.sort_unstable();

    let mut best: Option<(&str, Candidate)> = None;

    for symbol in symbols {
        let rows = &by_symbol[symbol];
        if rows.len() < 3 {
            continue;
        }

        let min_stamp = rows.iter().map(|t| t.stamp).min().unwrap();
        let max_stamp = rows.iter().map(|t| t.stamp).max().unwrap();
        let first_volume = rows.iter().min_by_key(|t| t.stamp).unwrap().volume;
        let last_volume = rows.iter().max_by_key(|t| t.stamp).unwrap().volume;

        let hours: Vec<f64> = rows
            .iter()
            .map(|t| (t.stamp - min_stamp) as f64 / HOUR_MS)
            .collect();
        let volume: Vec<f64> = rows.iter().map(|t| t.volume).collect();
        let price: Vec<f64> = rows.iter().map(|t| t.price).collect();

        let Some(model) = ols_fit(&hours, &volume, &price) else {
            continue;
        };

        let last_hours = (max_stamp - min_stamp) as f64 / HOUR_MS;
        let price_first = model.predict(0.0, first_volume);
        let price_last = model.predict(last_hours, last_volume);

        let absolute_trend = price_last - price_first;
        let relative_trend = if price_last != 0.0 {
            absolute_trend / price_last
        } else {
            0.0
        };

        if !threshold.accepts(absolute_trend, relative_trend) {
            continue;
        }

        let candidate = Candidate {
            absolute_trend,
            relative_trend,
            last_price: price_last,
        };

        let is_better = match best {
            None => true,
            Some((_, current)) => candidate.score(threshold) > current.score(threshold),
        };

        if is_better {
            best = Some((symbol, candidate));
        }
    }

    let Some((symbol, candidate)) = best else {
        return Ok(None);
    };

    if candidate.last_price <= 0.0 {
        return Ok(None);
    }

    let volume = (snapshot.budget.amount / candidate.last_price).floor();
    if volume <= 0.0 {
        return Ok(None);
    }

    Ok(Some(NewOrder {
        price: candidate.last_price,
        symbol: symbol.to_string(),
        stamp: now,
        volume: -volume,
    }))
}

/// Wraps [`evaluate`] as a `database.read`-triggered bus handler, publishing
/// any proposed order via `database.save` (both evaluators use
/// `database.save` for symmetry).
pub struct TrendEvaluator {
    publisher: BusPublisher,
    threshold: Threshold,
}

impl TrendEvaluator {
    pub fn new(publisher: BusPublisher, threshold: Threshold) -> Self {
        Self { publisher, threshold }
    }

    pub async fn handle(&mut self, payload: String) -> Result<(), AppError> {
        let snapshot: TrendSnapshot = serde_json::from_str(&payload)
            .map_err(|e| AppError::MalformedMessage(e.to_string()))?;

        let Some(order) = evaluate(&snapshot, self.threshold, snapshot.stamp)? else {
            return Ok(());
        };

        let table_desc =
            to_table_desc(&[order]).map_err(|e| AppError::MalformedMessage(e.to_string()))?;
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
    use crate::models::Budget;

    fn tx(symbol: &str, stamp: i64, price: f64, volume: f64) -> Transaction {
        Transaction {
            id: 0,
            price,
            symbol: symbol.to_string(),
            time: stamp / 1000,
            stamp,
            volume,
        }
    }

    #[test]
    fn happy_buy_allocates_whole_budget_to_rising_symbol() {
        let snapshot = TrendSnapshot {
            active_orders: 0,
            budget: Budget { id: 1, amount: 10_000.0, time: 0, stamp: 0 },
            transactions: vec![
                tx("AAA", 0, 100.0, 10.0),
                tx("AAA", 3_600_000, 110.0, 10.0),
                tx("AAA", 7_200_000, 120.0, 10.0),
            ],
            lookahead: 0,
            lookbehind: 3 * 3600,
            stamp: 7_200_000,
        };

        let order = evaluate(&snapshot, Threshold::parse("1%"), 7_200_000)
            .expect("not gated")
            .expect("order emitted");

        assert_eq!(order.symbol, "AAA");
        assert!(order.volume < 0.0);
        assert_eq!(order.volume, -(10_000.0 / 120.0).floor());
    }

    #[test]
    fn gates_when_active_orders_present() {
        let snapshot = TrendSnapshot {
            active_orders: 1,
            budget: Budget { id: 1, amount: 10_000.0, time: 0, stamp: 0 },
            transactions: vec![tx("AAA", 0, 100.0, 10.0)],
            lookahead: 0,
            lookbehind: 3600,
            stamp: 0,
        };

        assert!(evaluate(&snapshot, Threshold::parse("1%"), 0).is_err());
    }

    #[test]
    fn no_candidate_when_flat() {
        let snapshot = TrendSnapshot {
            active_orders: 0,
            budget: Budget { id: 1, amount: 10_000.0, time: 0, stamp: 0 },
            transactions: vec![
                tx("AAA", 0, 100.0, 10.0),
                tx("AAA", 3_600_000, 100.0, 10.0),
                tx("AAA", 7_200_000, 100.0, 10.0),
            ],
            lookahead: 0,
            lookbehind: 3 * 3600,
            stamp: 7_200_000,
        };

        let order = evaluate(&snapshot, Threshold::parse("1%"), 7_200_000).expect("not gated");
        assert!(order.is_none());
    }
}
