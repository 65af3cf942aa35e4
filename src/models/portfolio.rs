use serde::{Deserialize, Serialize};

/// One fill recorded against a transaction. `volume` carries the
/// same sign as the parent order. `|volume| <= transaction.volume - prior
/// used.volume` is enforced by the broker before the row is ever written.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PortfolioEntry {
    pub id: i64,
    pub transaction: i64,
    pub price: f64,
    pub commission: f64,
    pub symbol: String,
    pub time: i64,
    pub stamp: i64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPortfolioEntry {
    pub transaction: i64,
    pub price: f64,
    pub commission: f64,
    pub symbol: String,
    pub stamp: i64,
    pub volume: f64,
}

impl NewPortfolioEntry {
    pub fn time(&self) -> i64 {
        self.stamp.div_euclid(1000)
    }
}
