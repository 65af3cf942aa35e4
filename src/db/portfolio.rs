use crate::models::{NewPortfolioEntry, PortfolioRow};
use sqlx::{Postgres, Transaction};

/// Inserts new `portfolio` rows within an open transaction, part of the
/// broker's atomic write unit.
pub async fn insert_all(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[NewPortfolioEntry],
) -> Result<(), sqlx::Error> {
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO portfolio (transaction, price, commission, symbol, time, stamp, volume)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(row.transaction)
        .bind(row.price)
        .bind(row.commission)
        .bind(&row.symbol)
        .bind(row.time())
        .bind(row.stamp)
        .bind(row.volume)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Per-symbol portfolio aggregate for the `profit` query:
/// `sum(commission)`, `-sum(price*volume)` as `buy_value`, `-sum(volume)`
/// as `held_quantity`, `max(stamp)`. Only symbols with a nonzero held
/// quantity are returned.
pub async fn aggregate_by_symbol<'c, E>(executor: E) -> Result<Vec<PortfolioRow>, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let rows: Vec<(String, f64, f64, f64, i64)> = sqlx::query_as(
        r#"
        SELECT
            symbol,
            SUM(commission) AS commission,
            -SUM(price * volume) AS buy_value,
            -SUM(volume) AS held_quantity,
            MAX(stamp) AS buy_stamp
        FROM portfolio
        GROUP BY symbol
        HAVING -SUM(volume) <> 0
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(symbol, commission, buy_value, held_quantity, buy_stamp)| PortfolioRow {
            symbol,
            commission,
            buy_value,
            held_quantity,
            buy_stamp,
        })
        .collect())
}
