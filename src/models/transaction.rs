use serde::{Deserialize, Serialize};

/// A single observed market trade. Immutable once inserted; unique on
/// `(symbol, stamp)`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub price: f64,
    pub symbol: String,
    pub time: i64,
    pub stamp: i64,
    pub volume: f64,
}

/// A transaction as it arrives from the external feed, before an `id` has
/// been assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub price: f64,
    pub symbol: String,
    pub stamp: i64,
    pub volume: f64,
}

impl NewTransaction {
    /// `time` is derived from `stamp // 1000` when not otherwise supplied.
    pub fn time(&self) -> i64 {
        self.stamp.div_euclid(1000)
    }
}
