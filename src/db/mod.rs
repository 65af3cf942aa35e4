//! Postgres-backed store. `Database` wraps a `PgPool`; each table gets its
//! own narrow module of free functions taking `&PgPool` (or
//! `&mut Transaction`).

pub mod budget;
pub mod fakes;
pub mod orders;
pub mod portfolio;
pub mod queries;
pub mod schema;
pub mod transactions;
pub mod used;

use crate::error::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }
}
