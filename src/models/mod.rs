pub mod budget;
pub mod order;
pub mod portfolio;
pub mod snapshot;
pub mod transaction;
pub mod used;

pub use budget::Budget;
pub use order::{NewOrder, Order, OrderStatus, OrderUpdate};
pub use portfolio::{NewPortfolioEntry, PortfolioEntry};
pub use snapshot::{PortfolioRow, PriceRow, ProfitSnapshot, TrendSnapshot};
pub use transaction::{NewTransaction, Transaction};
pub use used::{NewUsed, Used};
