use super::Budget;
use super::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-symbol portfolio aggregate produced by the `profit` query. Signs are
/// inverted from the underlying signed-volume convention so `held_quantity`
/// reads as a natural positive figure for a long position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioRow {
    pub symbol: String,
    pub commission: f64,
    /// `-sum(price * volume)`: the cost basis of the position.
    pub buy_value: f64,
    /// `-sum(volume)`: held quantity, positive for a long position.
    pub held_quantity: f64,
    /// `max(stamp)`: when the position was last touched.
    pub buy_stamp: i64,
}

/// Latest transacted price for a symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceRow {
    pub price: f64,
    pub stamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfitSnapshot {
    pub active_orders: i64,
    pub budget: Budget,
    pub portfolio: Vec<PortfolioRow>,
    pub prices: HashMap<String, PriceRow>,
    pub stamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrendSnapshot {
    pub active_orders: i64,
    pub budget: Budget,
    pub transactions: Vec<Transaction>,
    pub lookahead: i64,
    pub lookbehind: i64,
    pub stamp: i64,
}
