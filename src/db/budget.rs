use crate::models::Budget;
use sqlx::{PgPool, Postgres, Transaction};

/// Reads the current budget (max-stamp row). If the table is empty, seeds
/// it with `default_amount` at `now` and persists the seed. Runs directly
/// against the pool rather than inside the caller's snapshot transaction.
/// The seed only ever fires once, on an empty table, so the extra round
/// trip costs nothing in steady state.
pub async fn current_or_seed(
    pool: &PgPool,
    default_amount: f64,
    now: i64,
) -> Result<Budget, sqlx::Error> {
    if let Some(budget) = latest(pool).await? {
        return Ok(budget);
    }

    let time = now.div_euclid(1000);
    sqlx::query_as(
        "INSERT INTO budget (amount, time, stamp) VALUES ($1, $2, $3) RETURNING id, amount, time, stamp",
    )
    .bind(default_amount)
    .bind(time)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn latest<'c, E>(executor: E) -> Result<Option<Budget>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT id, amount, time, stamp FROM budget ORDER BY stamp DESC LIMIT 1")
        .fetch_optional(executor)
        .await
}

/// Inserts the next budget row within an open transaction, part of the
/// broker's atomic write unit.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    amount: f64,
    now: i64,
) -> Result<(), sqlx::Error> {
    let time = now.div_euclid(1000);
    sqlx::query("INSERT INTO budget (amount, time, stamp) VALUES ($1, $2, $3)")
        .bind(amount)
        .bind(time)
        .bind(now)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
