//! Broker / Fulfilment engine: serially matches pending orders against
//! post-submission market transactions, enforces a budget reserve, and
//! writes updated order status, portfolio entries and a new budget row as
//! one atomic unit.

use crate::db::{budget, orders, portfolio, transactions, used, Database};
use crate::error::AppError;
use crate::models::{NewPortfolioEntry, NewUsed, Order, OrderStatus, OrderUpdate, Transaction};
use crate::threshold::Threshold;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// The broker's computed outcome for one invocation: order status/volume
/// updates plus the portfolio/used rows and budget delta they imply.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BrokerPlan {
    pub order_updates: Vec<OrderUpdate>,
    pub portfolio_entries: Vec<NewPortfolioEntry>,
    pub used_entries: Vec<NewUsed>,
    pub delta_budget: f64,
}

impl BrokerPlan {
    pub fn is_empty(&self) -> bool {
        self.order_updates.is_empty()
    }
}

/// The matching algorithm, a pure function over the one consistent read the
/// broker takes at invocation start. `commission` is evaluated per fill:
/// fixed is a flat fee, percent is `fraction * value`, with
/// `commission_value` already expressed as a 0..1 fraction by
/// [`Threshold::parse`].
pub fn match_orders(
    active_orders: &[Order],
    candidate_transactions: &[Transaction],
    prior_used: &HashMap<i64, f64>,
    budget_amount: f64,
    reserve: f64,
    commission: Threshold,
    now: i64,
) -> BrokerPlan {
    let mut candidates: Vec<&Transaction> = candidate_transactions.iter().collect();
    candidates.sort_by_key(|t| t.stamp);

    let mut currently_used: HashMap<i64, f64> = HashMap::new();
    let mut delta_budget = 0.0f64;
    let mut order_updates = Vec::new();
    let mut portfolio_entries = Vec::new();
    let mut used_entries = Vec::new();

    for order in active_orders {
        let initial_volume = order.volume;
        if initial_volume == 0.0 {
            continue;
        }

        let sign = if initial_volume < 0.0 { -1.0 } else { 1.0 };
        let initial_abs = initial_volume.abs();
        let mut remaining = initial_abs;

        let mut order_in_progress: HashMap<i64, f64> = HashMap::new();
        let mut order_used: Vec<NewUsed> = Vec::new();
        let mut order_portfolio: Vec<NewPortfolioEntry> = Vec::new();
        let mut order_delta = 0.0f64;

        for t in &candidates {
            if t.symbol != order.symbol {
                continue;
            }

            let prior = prior_used.get(&t.id).copied().unwrap_or(0.0);
            let committed = currently_used.get(&t.id).copied().unwrap_or(0.0);
            let in_progress = order_in_progress.get(&t.id).copied().unwrap_or(0.0);
            let available = t.volume - (prior + committed + in_progress);
            if available <= 0.0 {
                continue;
            }

            let use_volume = available.min(remaining);
            let value = t.price * use_volume;
            let fee = match commission {
                Threshold::Fixed(c) => c,
                Threshold::Percent(c) => c * value,
            };

            // Reserve check: a hard tie-break. If committing this fill would
            // breach reserve, the whole order is abandoned; any progress
            // recorded so far for it in this invocation is thrown away, and
            // matching moves on to the next order.
            let effective_budget = budget_amount + delta_budget + order_delta;
            if effective_budget + sign * value - fee < reserve {
                remaining = initial_abs;
                order_in_progress.clear();
                order_used.clear();
                order_portfolio.clear();
                order_delta = 0.0;
                break;
            }

            order_delta += sign * value - fee;
            *order_in_progress.entry(t.id).or_insert(0.0) += use_volume;
            order_used.push(NewUsed {
                transaction: t.id,
                stamp: t.stamp,
                volume: use_volume,
            });
            order_portfolio.push(NewPortfolioEntry {
                transaction: t.id,
                price: t.price,
                commission: fee,
                symbol: order.symbol.clone(),
                stamp: now,
                volume: sign * use_volume,
            });

            remaining -= use_volume;
            if remaining <= 0.0 {
                break;
            }
        }

        if order_in_progress.is_empty() {
            continue; // no fill and not abandoned mid-progress: nothing changed
        }

        for (id, v) in order_in_progress {
            *currently_used.entry(id).or_insert(0.0) += v;
        }
        delta_budget += order_delta;
        portfolio_entries.extend(order_portfolio);
        used_entries.extend(order_used);

        let status = if remaining <= 0.0 {
            OrderStatus::Fulfilled
        } else {
            OrderStatus::Partial
        };
        let new_volume = if status == OrderStatus::Fulfilled {
            0.0
        } else {
            sign * remaining
        };

        order_updates.push(OrderUpdate {
            id: order.id,
            status,
            volume: new_volume,
        });
    }

    BrokerPlan {
        order_updates,
        portfolio_entries,
        used_entries,
        delta_budget,
    }
}

/// Wraps [`match_orders`] with the store I/O and an in-process advisory
/// lock: a `tokio::sync::Mutex<()>` acquired with `try_lock` so a handler
/// invoked while a prior one is active returns immediately instead of
/// blocking. Combined with the bus's `prefetch=1`, this makes the broker a
/// single-writer within the process.
pub struct BrokerEngine {
    db: Database,
    default_budget: f64,
    reserve: f64,
    commission: Threshold,
    lock: Mutex<()>,
}

impl BrokerEngine {
    pub fn new(db: Database, default_budget: f64, reserve: f64, commission: Threshold) -> Self {
        Self {
            db,
            default_budget,
            reserve,
            commission,
            lock: Mutex::new(()),
        }
    }

    /// Runs one invocation for the given `stamp`/`lookahead`. Returns
    /// `Ok(())` without doing any work if a prior invocation is still
    /// active (re-entrance: skip, ack).
    pub async fn invoke(&self, stamp: i64, lookahead: i64) -> Result<(), AppError> {
        let Ok(_guard) = self.lock.try_lock() else {
            tracing::info!("broker invocation already in progress, skipping");
            return Ok(());
        };

        let order_stamp = stamp - lookahead * 1000;

        // Seeding fires at most once ever (empty table).
        budget::current_or_seed(&self.db.pool, self.default_budget, stamp).await?;

        let mut tx = self.db.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let active = orders::active(&mut *tx, order_stamp).await?;
        let candidates = transactions::window(&mut *tx, order_stamp, stamp, true).await?;
        let ids: Vec<i64> = candidates.iter().map(|t| t.id).collect();
        let prior_used = used::volume_by_transaction(&mut *tx, &ids).await?;
        let budget_row = budget::latest(&mut *tx).await?.unwrap_or_default();

        let plan = match_orders(
            &active,
            &candidates,
            &prior_used,
            budget_row.amount,
            self.reserve,
            self.commission,
            stamp,
        );

        if plan.is_empty() {
            tx.commit().await?;
            return Ok(());
        }

        portfolio::insert_all(&mut tx, &plan.portfolio_entries).await?;
        used::insert_all(&mut tx, &plan.used_entries).await?;
        budget::insert(&mut tx, budget_row.amount + plan.delta_budget, stamp).await?;
        orders::apply_updates(&mut tx, &plan.order_updates).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: i64, symbol: &str, volume: f64) -> Order {
        Order {
            id,
            price: 0.0,
            symbol: symbol.to_string(),
            time: 0,
            stamp: 0,
            volume,
            status: OrderStatus::Pending as i16,
        }
    }

    fn tx(id: i64, symbol: &str, stamp: i64, price: f64, volume: f64) -> Transaction {
        Transaction {
            id,
            price,
            symbol: symbol.to_string(),
            time: stamp / 1000,
            stamp,
            volume,
        }
    }

    #[test]
    fn broker_fills_fully() {
        let orders = vec![order(1, "AAA", -5.0)];
        let txns = vec![tx(1, "AAA", 0, 100.0, 10.0)];
        let plan = match_orders(&orders, &txns, &HashMap::new(), 1000.0, 0.0, Threshold::Fixed(0.0), 1000);

        assert_eq!(plan.order_updates.len(), 1);
        assert_eq!(plan.order_updates[0].status, OrderStatus::Fulfilled);
        assert_eq!(plan.order_updates[0].volume, 0.0);
        assert_eq!(plan.portfolio_entries.len(), 1);
        assert_eq!(plan.portfolio_entries[0].volume, -5.0);
        assert_eq!(plan.used_entries[0].volume, 5.0);
        assert_eq!(plan.delta_budget, -500.0);
    }

    #[test]
    fn reserve_breach_abandons_the_order() {
        let orders = vec![order(1, "AAA", -5.0)];
        let txns = vec![tx(1, "AAA", 0, 100.0, 10.0)];
        // budget 400, reserve 0: buying 5 @ 100 leaves -100 < 0 -> abandoned.
        let plan = match_orders(&orders, &txns, &HashMap::new(), 400.0, 0.0, Threshold::Fixed(0.0), 1000);

        assert!(plan.order_updates.is_empty());
        assert!(plan.portfolio_entries.is_empty());
        assert_eq!(plan.delta_budget, 0.0);
    }

    #[test]
    fn partial_fill_leaves_remaining_volume_with_sign_preserved() {
        let orders = vec![order(1, "AAA", -10.0)];
        let txns = vec![tx(1, "AAA", 0, 100.0, 7.0)];
        let plan = match_orders(&orders, &txns, &HashMap::new(), 10_000.0, 0.0, Threshold::Fixed(0.0), 1000);

        assert_eq!(plan.order_updates[0].status, OrderStatus::Partial);
        assert_eq!(plan.order_updates[0].volume, -3.0);
        assert_eq!(plan.portfolio_entries[0].volume, -7.0);
    }

    #[test]
    fn prior_used_volume_shrinks_availability() {
        let orders = vec![order(1, "AAA", -5.0)];
        let txns = vec![tx(1, "AAA", 0, 100.0, 10.0)];
        let mut prior = HashMap::new();
        prior.insert(1, 8.0); // only 2 left available

        let plan = match_orders(&orders, &txns, &prior, 10_000.0, 0.0, Threshold::Fixed(0.0), 1000);

        assert_eq!(plan.order_updates[0].status, OrderStatus::Partial);
        assert_eq!(plan.portfolio_entries[0].volume, -2.0);
    }

    #[test]
    fn double_delivery_with_no_active_orders_writes_nothing() {
        let txns = vec![tx(1, "AAA", 0, 100.0, 10.0)];
        let plan = match_orders(&[], &txns, &HashMap::new(), 1000.0, 0.0, Threshold::Fixed(0.0), 1000);
        assert!(plan.is_empty());
    }
}
