//! Assembles the Query worker's two snapshot shapes from the narrow
//! per-table modules. Every read here runs inside one `REPEATABLE READ`
//! transaction so the bundle the evaluator sees is internally consistent
//! even under concurrent ingest.

use super::{budget, orders, portfolio, transactions};
use crate::models::{PriceRow, ProfitSnapshot, TrendSnapshot};
use sqlx::PgPool;
use std::collections::HashMap;

/// Builds the `profit` snapshot.
pub async fn profit_snapshot(
    pool: &PgPool,
    stamp: i64,
    default_budget: f64,
) -> Result<ProfitSnapshot, sqlx::Error> {
    // Seeding only ever fires once, against an empty table, so it runs ahead
    // of the snapshot transaction rather than inside it.
    budget::current_or_seed(pool, default_budget, stamp).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await?;

    let active_orders = orders::count_active(&mut *tx, stamp).await?;
    let budget = budget::latest(&mut *tx).await?.unwrap_or_default();
    let portfolio = portfolio::aggregate_by_symbol(&mut *tx).await?;
    let prices: HashMap<String, PriceRow> = transactions::latest_prices(&mut *tx)
        .await?
        .into_iter()
        .map(|t| {
            (
                t.symbol,
                PriceRow {
                    price: t.price,
                    stamp: t.stamp,
                },
            )
        })
        .collect();

    tx.commit().await?;

    Ok(ProfitSnapshot {
        active_orders,
        budget,
        portfolio,
        prices,
        stamp,
    })
}

/// Builds the `trends` snapshot. The transaction window
/// is shifted back by `lookahead` seconds: an order placed now won't execute
/// until then, so the evaluator must learn from data at least that stale.
pub async fn trends_snapshot(
    pool: &PgPool,
    stamp: i64,
    lookahead: i64,
    lookbehind: i64,
    default_budget: f64,
) -> Result<TrendSnapshot, sqlx::Error> {
    budget::current_or_seed(pool, default_budget, stamp).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await?;

    let active_orders = orders::count_active(&mut *tx, stamp).await?;
    let budget = budget::latest(&mut *tx).await?.unwrap_or_default();

    let lookahead_ms = lookahead * 1000;
    let lookbehind_ms = lookbehind * 1000;
    let from = stamp - (lookbehind_ms + lookahead_ms);
    let to = stamp - lookahead_ms;
    let transactions = transactions::window(&mut *tx, from, to, false).await?;

    tx.commit().await?;

    Ok(TrendSnapshot {
        active_orders,
        budget,
        transactions,
        lookahead,
        lookbehind,
        stamp,
    })
}

#[cfg(test)]
mod tests {
    // Exercised against a live Postgres in integration tests; the pure
    // windowing/aggregation math underneath each of these is covered via
    // `db::fakes` in the evaluator and broker test modules instead.
}
