use crate::models::{NewOrder, Order, OrderUpdate};
use sqlx::{PgPool, Postgres, Transaction};

/// Count of active orders (`PENDING`/`PARTIAL`) with `stamp <= at`, used by
/// the query worker's gating field and the broker's own read. Generic over
/// the executor so the query worker can run it inside its snapshot
/// transaction alongside the other reads.
pub async fn count_active<'c, E>(executor: E, at: i64) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE stamp <= $1 AND status IN (0, 1)")
        .bind(at)
        .fetch_one(executor)
        .await
}

/// Active orders with `stamp <= at`, the broker's matching input.
pub async fn active<'c, E>(executor: E, at: i64) -> Result<Vec<Order>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "SELECT id, price, symbol, time, stamp, volume, status FROM orders \
         WHERE stamp <= $1 AND status IN (0, 1) ORDER BY stamp ASC",
    )
    .bind(at)
    .fetch_all(executor)
    .await
}

/// Inserts one order, ignoring a duplicate `(symbol, stamp)` so
/// redelivered evaluator proposals stay idempotent.
pub async fn insert_ignore(pool: &PgPool, order: &NewOrder) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (price, symbol, time, stamp, volume, status)
        VALUES ($1, $2, $3, $4, $5, 0)
        ON CONFLICT (symbol, stamp) DO NOTHING
        "#,
    )
    .bind(order.price)
    .bind(&order.symbol)
    .bind(order.time())
    .bind(order.stamp)
    .bind(order.volume)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn insert_ignore_batch(pool: &PgPool, orders: &[NewOrder]) -> Result<u64, sqlx::Error> {
    let mut total = 0u64;
    for order in orders {
        total += insert_ignore(pool, order).await?;
    }
    Ok(total)
}

/// Batch-updates orders by id with `(status, volume)` from the broker's
/// plan, within an open transaction. The last write of the atomic unit.
pub async fn apply_updates(
    tx: &mut Transaction<'_, Postgres>,
    updates: &[OrderUpdate],
) -> Result<(), sqlx::Error> {
    for update in updates {
        sqlx::query("UPDATE orders SET status = $1, volume = $2 WHERE id = $3")
            .bind(update.status as i16)
            .bind(update.volume)
            .bind(update.id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
