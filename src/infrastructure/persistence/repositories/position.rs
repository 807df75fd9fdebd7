use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::domain::errors::SentinelResult;
use crate::domain::ids::Isin;
use crate::domain::portfolio::Position;
use crate::domain::repositories::PositionRepository;

pub struct SqlitePositionRepository {
    pool: SqlitePool,
}

impl SqlitePositionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    isin: String,
    quantity: String,
    avg_cost: String,
    market_price: String,
    market_value_eur: String,
    last_update: String,
}

fn to_domain(row: Row) -> SentinelResult<Position> {
    Ok(Position {
        isin: Isin::parse(&row.isin)?,
        quantity: Decimal::from_str(&row.quantity).unwrap_or_default(),
        avg_cost: Decimal::from_str(&row.avg_cost).unwrap_or_default(),
        market_price: Decimal::from_str(&row.market_price).unwrap_or_default(),
        market_value_eur: Decimal::from_str(&row.market_value_eur).unwrap_or_default(),
        last_update: DateTime::parse_from_rfc3339(&row.last_update)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait]
impl PositionRepository for SqlitePositionRepository {
    /// Full replacement keeps the store consistent with the latest broker
    /// snapshot without reconciling individual rows (spec §3).
    async fn replace_all(&self, positions: &[Position]) -> SentinelResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM positions").execute(&mut *tx).await?;
        for p in positions {
            sqlx::query(
                "INSERT INTO positions (isin, quantity, avg_cost, market_price, market_value_eur, last_update) \
                 VALUES (?,?,?,?,?,?)",
            )
            .bind(p.isin.as_str())
            .bind(p.quantity.to_string())
            .bind(p.avg_cost.to_string())
            .bind(p.market_price.to_string())
            .bind(p.market_value_eur.to_string())
            .bind(p.last_update.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn all(&self) -> SentinelResult<Vec<Position>> {
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT isin, quantity, avg_cost, market_price, market_value_eur, last_update FROM positions",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(to_domain).collect()
    }
}
