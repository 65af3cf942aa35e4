//! Schema creation: plain `CREATE TABLE IF NOT EXISTS` DDL constants run
//! once at connect time, rather than a migration file tree.

use sqlx::PgPool;

pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("initializing schema");

    sqlx::query(CREATE_TRANSACTIONS_TABLE).execute(pool).await?;
    sqlx::query(CREATE_ORDERS_TABLE).execute(pool).await?;
    sqlx::query(CREATE_PORTFOLIO_TABLE).execute(pool).await?;
    sqlx::query(CREATE_USED_TABLE).execute(pool).await?;
    sqlx::query(CREATE_BUDGET_TABLE).execute(pool).await?;

    tracing::info!("schema ready");
    Ok(())
}

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id BIGSERIAL PRIMARY KEY,
    price DOUBLE PRECISION NOT NULL,
    symbol TEXT NOT NULL,
    time BIGINT NOT NULL,
    stamp BIGINT NOT NULL,
    volume DOUBLE PRECISION NOT NULL CHECK (volume > 0),
    UNIQUE (symbol, stamp)
)
"#;

const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id BIGSERIAL PRIMARY KEY,
    price DOUBLE PRECISION NOT NULL,
    symbol TEXT NOT NULL,
    time BIGINT NOT NULL,
    stamp BIGINT NOT NULL,
    volume DOUBLE PRECISION NOT NULL,
    status SMALLINT NOT NULL DEFAULT 0,
    UNIQUE (symbol, stamp)
)
"#;

const CREATE_PORTFOLIO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS portfolio (
    id BIGSERIAL PRIMARY KEY,
    transaction BIGINT NOT NULL REFERENCES transactions (id),
    price DOUBLE PRECISION NOT NULL,
    commission DOUBLE PRECISION NOT NULL,
    symbol TEXT NOT NULL,
    time BIGINT NOT NULL,
    stamp BIGINT NOT NULL,
    volume DOUBLE PRECISION NOT NULL
)
"#;

const CREATE_USED_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS used (
    id BIGSERIAL PRIMARY KEY,
    transaction BIGINT NOT NULL REFERENCES transactions (id),
    stamp BIGINT NOT NULL,
    volume DOUBLE PRECISION NOT NULL CHECK (volume > 0)
)
"#;

const CREATE_BUDGET_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS budget (
    id BIGSERIAL PRIMARY KEY,
    amount DOUBLE PRECISION NOT NULL,
    time BIGINT NOT NULL,
    stamp BIGINT NOT NULL
)
"#;
