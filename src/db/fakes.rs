//! In-memory stand-in for the store's read side, mirroring the SQL in
//! `orders`/`portfolio`/`transactions`/`used`/`budget` as plain `HashMap`/
//! `Vec` arithmetic. Lets the broker and evaluator logic be exercised by
//! unit tests without a live Postgres connection.

use crate::models::{Budget, Order, OrderStatus, PortfolioEntry, PortfolioRow, Transaction, Used};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct FakeStore {
    pub transactions: Vec<Transaction>,
    pub orders: Vec<Order>,
    pub portfolio: Vec<PortfolioEntry>,
    pub used: Vec<Used>,
    pub budgets: Vec<Budget>,
}

impl FakeStore {
    pub fn count_active(&self, at: i64) -> i64 {
        self.active(at).len() as i64
    }

    pub fn active(&self, at: i64) -> Vec<Order> {
        let mut rows: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| {
                o.stamp <= at && matches!(o.status(), OrderStatus::Pending | OrderStatus::Partial)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|o| o.stamp);
        rows
    }

    pub fn window(&self, from: i64, to: i64, exclusive_from: bool) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| {
                if exclusive_from {
                    t.stamp > from && t.stamp <= to
                } else {
                    t.stamp >= from && t.stamp < to
                }
            })
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.stamp);
        rows
    }

    pub fn latest_prices(&self) -> Vec<Transaction> {
        let mut latest: HashMap<&str, &Transaction> = HashMap::new();
        for t in &self.transactions {
            latest
                .entry(t.symbol.as_str())
                .and_modify(|cur| {
                    if t.stamp > cur.stamp {
                        *cur = t;
                    }
                })
                .or_insert(t);
        }
        latest.into_values().cloned().collect()
    }

    pub fn volume_by_transaction(&self, ids: &[i64]) -> HashMap<i64, f64> {
        let mut out = HashMap::new();
        for u in &self.used {
            if ids.contains(&u.transaction) {
                *out.entry(u.transaction).or_insert(0.0) += u.volume;
            }
        }
        out
    }

    pub fn aggregate_by_symbol(&self) -> Vec<PortfolioRow> {
        let mut groups: HashMap<&str, (f64, f64, f64, i64)> = HashMap::new();
        for p in &self.portfolio {
            let entry = groups.entry(p.symbol.as_str()).or_insert((0.0, 0.0, 0.0, 0));
            entry.0 += p.commission;
            entry.1 += -(p.price * p.volume);
            entry.2 += -p.volume;
            entry.3 = entry.3.max(p.stamp);
        }

        groups
            .into_iter()
            .filter(|(_, (_, _, held_quantity, _))| *held_quantity != 0.0)
            .map(
                |(symbol, (commission, buy_value, held_quantity, buy_stamp))| PortfolioRow {
                    symbol: symbol.to_string(),
                    commission,
                    buy_value,
                    held_quantity,
                    buy_stamp,
                },
            )
            .collect()
    }

    pub fn latest_budget(&self) -> Option<Budget> {
        self.budgets.iter().max_by_key(|b| b.stamp).cloned()
    }

    pub fn current_or_seed(&mut self, default_amount: f64, now: i64) -> Budget {
        if let Some(budget) = self.latest_budget() {
            return budget;
        }
        let budget = Budget {
            id: self.budgets.len() as i64 + 1,
            amount: default_amount,
            time: now.div_euclid(1000),
            stamp: now,
        };
        self.budgets.push(budget.clone());
        budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: i64, stamp: i64, volume: f64, status: OrderStatus) -> Order {
        Order {
            id,
            price: 100.0,
            symbol: "AAA".into(),
            time: stamp / 1000,
            stamp,
            volume,
            status: status as i16,
        }
    }

    #[test]
    fn active_excludes_fulfilled_and_future_orders() {
        let store = FakeStore {
            orders: vec![
                order(1, 100, -5.0, OrderStatus::Pending),
                order(2, 100, 5.0, OrderStatus::Fulfilled),
                order(3, 10_000, -5.0, OrderStatus::Pending),
            ],
            ..Default::default()
        };

        let active = store.active(1_000);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);
    }

    #[test]
    fn aggregate_drops_symbols_with_zero_held_quantity() {
        let store = FakeStore {
            portfolio: vec![
                PortfolioEntry {
                    id: 1,
                    transaction: 1,
                    price: 100.0,
                    commission: 1.0,
                    symbol: "AAA".into(),
                    time: 0,
                    stamp: 0,
                    volume: -5.0,
                },
                PortfolioEntry {
                    id: 2,
                    transaction: 2,
                    price: 110.0,
                    commission: 1.0,
                    symbol: "AAA".into(),
                    time: 0,
                    stamp: 1,
                    volume: 5.0,
                },
            ],
            ..Default::default()
        };

        assert!(store.aggregate_by_symbol().is_empty());
    }

    #[test]
    fn current_or_seed_persists_the_seed_once() {
        let mut store = FakeStore::default();
        let seeded = store.current_or_seed(10_000.0, 1_000);
        assert_eq!(seeded.amount, 10_000.0);
        assert_eq!(store.budgets.len(), 1);

        let again = store.current_or_seed(999.0, 2_000);
        assert_eq!(again.amount, 10_000.0);
        assert_eq!(store.budgets.len(), 1);
    }
}
