use serde::{Deserialize, Serialize};

/// Tracks volume of a transaction already claimed by fills.
/// `sum(volume) per transaction <= transaction.volume` is the core
/// no-double-spend invariant.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Used {
    pub id: i64,
    pub transaction: i64,
    pub stamp: i64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUsed {
    pub transaction: i64,
    pub stamp: i64,
    pub volume: f64,
}
