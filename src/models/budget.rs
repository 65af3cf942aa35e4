use serde::{Deserialize, Serialize};

/// Append-only budget log. The current budget is always the row with the
/// maximum `stamp`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Budget {
    pub id: i64,
    pub amount: f64,
    pub time: i64,
    pub stamp: i64,
}

impl Default for Budget {
    fn default() -> Self {
        Budget {
            id: 0,
            amount: 0.0,
            time: 0,
            stamp: 0,
        }
    }
}
