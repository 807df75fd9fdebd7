use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::domain::errors::SentinelResult;
use crate::domain::ids::Isin;
use crate::domain::ledger::{Side, Trade, TradeSource, TradingMode};
use crate::domain::repositories::TradeRepository;

pub struct SqliteTradeRepository {
    pool: SqlitePool,
}

impl SqliteTradeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    isin: String,
    symbol: String,
    side: String,
    quantity: String,
    price: String,
    currency: String,
    currency_rate: String,
    value_eur: String,
    executed_at: String,
    order_id: String,
    source: String,
    mode: String,
    bucket_id: Option<String>,
}

fn to_domain(row: Row) -> SentinelResult<Trade> {
    Ok(Trade {
        id: row.id,
        isin: Isin::parse(&row.isin)?,
        symbol: row.symbol,
        side: row.side.parse::<Side>()?,
        quantity: Decimal::from_str(&row.quantity).unwrap_or_default(),
        price: Decimal::from_str(&row.price).unwrap_or_default(),
        currency: row.currency,
        currency_rate: Decimal::from_str(&row.currency_rate).unwrap_or(Decimal::ONE),
        value_eur: Decimal::from_str(&row.value_eur).unwrap_or_default(),
        executed_at: DateTime::parse_from_rfc3339(&row.executed_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        order_id: row.order_id,
        source: match row.source.as_str() {
            "plan" => TradeSource::Plan,
            "drip" => TradeSource::Drip,
            _ => TradeSource::Manual,
        },
        mode: match row.mode.as_str() {
            "research" => TradingMode::Research,
            _ => TradingMode::Live,
        },
        bucket_id: row.bucket_id,
    })
}

const SELECT: &str = "SELECT id, isin, symbol, side, quantity, price, currency, currency_rate, \
    value_eur, executed_at, order_id, source, mode, bucket_id FROM trades";

#[async_trait]
impl TradeRepository for SqliteTradeRepository {
    async fn append(&self, trade: &Trade) -> SentinelResult<Trade> {
        let source = match trade.source {
            TradeSource::Manual => "manual",
            TradeSource::Plan => "plan",
            TradeSource::Drip => "drip",
        };
        let mode = match trade.mode {
            TradingMode::Live => "live",
            TradingMode::Research => "research",
        };
        let id: (i64,) = sqlx::query_as(
            "INSERT INTO trades (order_id, isin, symbol, side, quantity, price, currency, \
             currency_rate, value_eur, executed_at, source, mode, bucket_id) \
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?) RETURNING id",
        )
        .bind(&trade.order_id)
        .bind(trade.isin.as_str())
        .bind(&trade.symbol)
        .bind(trade.side.as_str())
        .bind(trade.quantity.to_string())
        .bind(trade.price.to_string())
        .bind(&trade.currency)
        .bind(trade.currency_rate.to_string())
        .bind(trade.value_eur.to_string())
        .bind(trade.executed_at.to_rfc3339())
        .bind(source)
        .bind(mode)
        .bind(&trade.bucket_id)
        .fetch_one(&self.pool)
        .await?;

        let mut appended = trade.clone();
        appended.id = id.0;
        Ok(appended)
    }

    async fn recent(&self, limit: usize) -> SentinelResult<Vec<Trade>> {
        let rows: Vec<Row> = sqlx::query_as(&format!(
            "{SELECT} ORDER BY executed_at DESC LIMIT {}",
            limit as i64
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(to_domain).collect()
    }

    async fn all(&self) -> SentinelResult<Vec<Trade>> {
        let rows: Vec<Row> = sqlx::query_as(&format!("{SELECT} ORDER BY executed_at ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(to_domain).collect()
    }

    async fn find_by_order_id(&self, order_id: &str) -> SentinelResult<Option<Trade>> {
        let row: Option<Row> = sqlx::query_as(&format!("{SELECT} WHERE order_id = ?"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(to_domain).transpose()
    }
}
