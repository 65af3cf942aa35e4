use crate::models::NewUsed;
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;

/// Sum of `used.volume` per transaction id, restricted to the given ids.
/// This is the broker's "prior used volume" read.
pub async fn volume_by_transaction<'c, E>(
    executor: E,
    ids: &[i64],
) -> Result<HashMap<i64, f64>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i64, f64)> = sqlx::query_as(
        "SELECT transaction, SUM(volume) FROM used WHERE transaction = ANY($1) GROUP BY transaction",
    )
    .bind(ids)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Inserts new `used` rows within an open transaction, part of the
/// broker's atomic write unit.
pub async fn insert_all(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[NewUsed],
) -> Result<(), sqlx::Error> {
    for row in rows {
        sqlx::query("INSERT INTO used (transaction, stamp, volume) VALUES ($1, $2, $3)")
            .bind(row.transaction)
            .bind(row.stamp)
            .bind(row.volume)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
