use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::domain::errors::SentinelResult;
use crate::domain::history::FxRate;
use crate::domain::repositories::FxRateRepository;

pub struct SqliteFxRateRepository {
    pool: SqlitePool,
}

impl SqliteFxRateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    from_currency: String,
    to_currency: String,
    date: String,
    rate: String,
}

fn to_domain(row: Row) -> SentinelResult<FxRate> {
    Ok(FxRate {
        from_currency: row.from_currency,
        to_currency: row.to_currency,
        date: NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|e| crate::domain::errors::SentinelError::internal(e.to_string()))?,
        rate: Decimal::from_str(&row.rate).unwrap_or(Decimal::ONE),
    })
}

#[async_trait]
impl FxRateRepository for SqliteFxRateRepository {
    async fn upsert(&self, rate: &FxRate) -> SentinelResult<()> {
        sqlx::query(
            "INSERT INTO fx_rates (from_currency, to_currency, date, rate) VALUES (?,?,?,?) \
             ON CONFLICT(from_currency, to_currency, date) DO UPDATE SET rate = excluded.rate",
        )
        .bind(&rate.from_currency)
        .bind(&rate.to_currency)
        .bind(rate.date.format("%Y-%m-%d").to_string())
        .bind(rate.rate.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest(&self, from: &str, to: &str) -> SentinelResult<Option<FxRate>> {
        let row: Option<Row> = sqlx::query_as(
            "SELECT from_currency, to_currency, date, rate FROM fx_rates \
             WHERE from_currency = ? AND to_currency = ? ORDER BY date DESC LIMIT 1",
        )
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        row.map(to_domain).transpose()
    }
}
