//! Sqlite-backed `SecurityRepository` (universe store).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::str::FromStr;

use crate::domain::errors::SentinelResult;
use crate::domain::ids::Isin;
use crate::domain::repositories::SecurityRepository;
use crate::domain::security::{ProductType, Security};

pub struct SqliteSecurityRepository {
    pool: SqlitePool,
}

impl SqliteSecurityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    isin: String,
    symbol: String,
    name: String,
    exchange_code: String,
    currency: String,
    country: String,
    industry: String,
    product_type: String,
    min_lot: String,
    active: bool,
    allow_buy: bool,
    allow_sell: bool,
    tags: String,
    last_synced: Option<String>,
}

fn to_domain(row: Row) -> SentinelResult<Security> {
    Ok(Security {
        isin: Isin::parse(&row.isin)?,
        symbol: row.symbol,
        name: row.name,
        exchange_code: row.exchange_code,
        currency: row.currency,
        country: row.country,
        industry: row.industry,
        product_type: serde_json::from_str::<ProductType>(&format!("\"{}\"", row.product_type))
            .unwrap_or_default(),
        min_lot: Decimal::from_str(&row.min_lot).unwrap_or(Decimal::ONE),
        active: row.active,
        allow_buy: row.allow_buy,
        allow_sell: row.allow_sell,
        tags: serde_json::from_str::<HashSet<String>>(&row.tags).unwrap_or_default(),
        last_synced: row
            .last_synced
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

const SELECT: &str = "SELECT isin, symbol, name, exchange_code, currency, country, industry, \
    product_type, min_lot, active, allow_buy, allow_sell, tags, last_synced FROM securities";

#[async_trait]
impl SecurityRepository for SqliteSecurityRepository {
    async fn upsert(&self, security: &Security) -> SentinelResult<()> {
        let product_type = serde_json::to_string(&security.product_type)
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();
        let tags = serde_json::to_string(&security.tags).unwrap_or_else(|_| "[]".to_string());
        sqlx::query(
            "INSERT INTO securities (isin, symbol, name, exchange_code, currency, country, industry, \
             product_type, min_lot, active, allow_buy, allow_sell, tags, last_synced) \
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?) \
             ON CONFLICT(isin) DO UPDATE SET symbol=excluded.symbol, name=excluded.name, \
             exchange_code=excluded.exchange_code, currency=excluded.currency, country=excluded.country, \
             industry=excluded.industry, product_type=excluded.product_type, min_lot=excluded.min_lot, \
             active=excluded.active, allow_buy=excluded.allow_buy, allow_sell=excluded.allow_sell, \
             tags=excluded.tags, last_synced=excluded.last_synced",
        )
        .bind(security.isin.as_str())
        .bind(&security.symbol)
        .bind(&security.name)
        .bind(&security.exchange_code)
        .bind(&security.currency)
        .bind(&security.country)
        .bind(&security.industry)
        .bind(product_type)
        .bind(security.min_lot.to_string())
        .bind(security.active)
        .bind(security.allow_buy)
        .bind(security.allow_sell)
        .bind(tags)
        .bind(security.last_synced.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, isin: &Isin) -> SentinelResult<Option<Security>> {
        let row: Option<Row> = sqlx::query_as(&format!("{SELECT} WHERE isin = ?"))
            .bind(isin.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(to_domain).transpose()
    }

    async fn all_active(&self) -> SentinelResult<Vec<Security>> {
        let all = self.all().await?;
        Ok(all.into_iter().filter(|s| s.active).collect())
    }

    async fn all(&self) -> SentinelResult<Vec<Security>> {
        let rows: Vec<Row> = sqlx::query_as(SELECT).fetch_all(&self.pool).await?;
        rows.into_iter().map(to_domain).collect()
    }

    async fn set_active(&self, isin: &Isin, active: bool) -> SentinelResult<()> {
        sqlx::query("UPDATE securities SET active = ? WHERE isin = ?")
            .bind(active)
            .bind(isin.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
