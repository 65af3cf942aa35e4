use serde::{Deserialize, Serialize};

/// Order lifecycle state. Monotonic toward `Fulfilled`; the broker is the
/// only writer and never moves an order backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i16)]
pub enum OrderStatus {
    Pending = 0,
    Partial = 1,
    Fulfilled = 2,
}

impl TryFrom<i16> for OrderStatus {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Partial),
            2 => Ok(OrderStatus::Fulfilled),
            other => Err(format!("unknown order status {other}")),
        }
    }
}

/// A buy or sell order. `volume` is signed: negative is a buy, positive is
/// a sell. Unique on `(symbol, stamp)`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub price: f64,
    pub symbol: String,
    pub time: i64,
    pub stamp: i64,
    pub volume: f64,
    pub status: i16,
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::try_from(self.status).unwrap_or(OrderStatus::Pending)
    }

    pub fn is_buy(&self) -> bool {
        self.volume < 0.0
    }

    pub fn is_sell(&self) -> bool {
        self.volume > 0.0
    }
}

/// A proposed order emitted by an evaluator, not yet assigned an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub price: f64,
    pub symbol: String,
    pub stamp: i64,
    pub volume: f64,
}

impl NewOrder {
    pub fn time(&self) -> i64 {
        self.stamp.div_euclid(1000)
    }
}

/// The broker's in-memory plan for one order at the end of a matching pass:
/// either unchanged (no fill at all) or an update to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub id: i64,
    pub status: OrderStatus,
    pub volume: f64,
}
