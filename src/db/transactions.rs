use crate::models::{NewTransaction, Transaction};
use sqlx::{PgPool, Postgres};

/// Insert-ignore: duplicate `(symbol, stamp)` rows are silently dropped, so
/// the ingest worker stays idempotent under redelivery and stream replay.
pub async fn insert_ignore_batch(pool: &PgPool, rows: &[NewTransaction]) -> Result<u64, sqlx::Error> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for row in rows {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (price, symbol, time, stamp, volume)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (symbol, stamp) DO NOTHING
            "#,
        )
        .bind(row.price)
        .bind(&row.symbol)
        .bind(row.time())
        .bind(row.stamp)
        .bind(row.volume)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Transactions with `stamp` in `[from, to)`, used by the trend evaluator's
/// lookbehind window and the broker's candidate window (there bounded
/// `(from, to]` via `exclusive_from`).
pub async fn window<'c, E>(
    executor: E,
    from: i64,
    to: i64,
    exclusive_from: bool,
) -> Result<Vec<Transaction>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let query = if exclusive_from {
        "SELECT id, price, symbol, time, stamp, volume FROM transactions \
         WHERE stamp > $1 AND stamp <= $2 ORDER BY stamp ASC"
    } else {
        "SELECT id, price, symbol, time, stamp, volume FROM transactions \
         WHERE stamp >= $1 AND stamp < $2 ORDER BY stamp ASC"
    };

    sqlx::query_as::<_, Transaction>(query)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await
}

/// Latest transacted price per symbol: inner join on `(symbol, max(stamp))`.
pub async fn latest_prices<'c, E>(executor: E) -> Result<Vec<Transaction>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT t.id, t.price, t.symbol, t.time, t.stamp, t.volume
        FROM transactions t
        INNER JOIN (
            SELECT symbol, MAX(stamp) AS stamp
            FROM transactions
            GROUP BY symbol
        ) latest ON latest.symbol = t.symbol AND latest.stamp = t.stamp
        "#,
    )
    .fetch_all(executor)
    .await
}
