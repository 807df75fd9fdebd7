use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::domain::errors::SentinelResult;
use crate::domain::history::PriceBar;
use crate::domain::ids::Isin;
use crate::domain::repositories::PriceBarRepository;

pub struct SqlitePriceBarRepository {
    pool: SqlitePool,
}

impl SqlitePriceBarRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    isin: String,
    date: String,
    open: String,
    high: String,
    low: String,
    close: String,
    adjusted_close: String,
    volume: i64,
}

fn to_domain(row: Row) -> SentinelResult<PriceBar> {
    Ok(PriceBar {
        isin: Isin::parse(&row.isin)?,
        date: NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|e| crate::domain::errors::SentinelError::internal(e.to_string()))?,
        open: Decimal::from_str(&row.open).unwrap_or_default(),
        high: Decimal::from_str(&row.high).unwrap_or_default(),
        low: Decimal::from_str(&row.low).unwrap_or_default(),
        close: Decimal::from_str(&row.close).unwrap_or_default(),
        adjusted_close: Decimal::from_str(&row.adjusted_close).unwrap_or_default(),
        volume: row.volume,
    })
}

const SELECT: &str = "SELECT isin, date, open, high, low, close, adjusted_close, volume FROM price_bars";

#[async_trait]
impl PriceBarRepository for SqlitePriceBarRepository {
    /// Last-writer-wins on `(isin, date)` (spec §9 open question resolution:
    /// a re-sync overwrites a prior provisional bar with the final one).
    async fn upsert(&self, bar: &PriceBar) -> SentinelResult<()> {
        sqlx::query(
            "INSERT INTO price_bars (isin, date, open, high, low, close, adjusted_close, volume) \
             VALUES (?,?,?,?,?,?,?,?) \
             ON CONFLICT(isin, date) DO UPDATE SET open=excluded.open, high=excluded.high, \
             low=excluded.low, close=excluded.close, adjusted_close=excluded.adjusted_close, \
             volume=excluded.volume",
        )
        .bind(bar.isin.as_str())
        .bind(bar.date.format("%Y-%m-%d").to_string())
        .bind(bar.open.to_string())
        .bind(bar.high.to_string())
        .bind(bar.low.to_string())
        .bind(bar.close.to_string())
        .bind(bar.adjusted_close.to_string())
        .bind(bar.volume)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn range(&self, isin: &Isin, from: NaiveDate, to: NaiveDate) -> SentinelResult<Vec<PriceBar>> {
        let rows: Vec<Row> = sqlx::query_as(&format!("{SELECT} WHERE isin = ? AND date BETWEEN ? AND ? ORDER BY date ASC"))
            .bind(isin.as_str())
            .bind(from.format("%Y-%m-%d").to_string())
            .bind(to.format("%Y-%m-%d").to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(to_domain).collect()
    }

    async fn latest(&self, isin: &Isin) -> SentinelResult<Option<PriceBar>> {
        let row: Option<Row> = sqlx::query_as(&format!("{SELECT} WHERE isin = ? ORDER BY date DESC LIMIT 1"))
            .bind(isin.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(to_domain).transpose()
    }
}
