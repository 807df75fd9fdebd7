//! Abstract external collaborators (spec §4.4). Broker SDK and market-data
//! vendor specifics are out of scope (spec §1); these traits are the seam
//! concrete adapters are injected behind, following the teacher's
//! `MarketDataService`/`ExecutionService` port pattern.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::errors::SentinelResult;
use crate::domain::history::PriceBar;
use crate::domain::ids::Isin;
use crate::domain::ledger::{CashFlow, Side, Trade};
use crate::domain::market_hours::Mic;
use crate::domain::portfolio::{CashBalance, Position};

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub isin: Isin,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct OrderAck {
    pub order_id: String,
    pub accepted_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerFailureClass {
    Transient,
    Rejected,
    Unknown,
}

#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn place_order(&self, order: OrderRequest) -> SentinelResult<OrderAck>;
    async fn positions(&self) -> SentinelResult<Vec<Position>>;
    async fn cash_balances(&self) -> SentinelResult<Vec<CashBalance>>;
    async fn cash_movements(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SentinelResult<Vec<CashFlow>>;
    async fn executed_trades(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SentinelResult<Vec<Trade>>;
    async fn quote(&self, symbol: &str) -> SentinelResult<Decimal>;
    async fn historical_ohlc(
        &self,
        isin: &Isin,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> SentinelResult<Vec<PriceBar>>;
    /// Whether the client currently holds a live connection, and since when.
    async fn connected(&self) -> (bool, Option<DateTime<Utc>>);
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Source label, e.g. `tradernet`, `yahoo`.
    fn label(&self) -> &str;
    async fn batch_quote(&self, symbols: &[String]) -> SentinelResult<HashMap<String, Decimal>>;
}

#[async_trait]
pub trait FxSource: Send + Sync {
    async fn current_rate(&self, from: &str, to: &str) -> SentinelResult<Decimal>;
    async fn historical_rate(&self, from: &str, to: &str, date: NaiveDate) -> SentinelResult<Decimal>;
}

#[derive(Debug, Clone, Default)]
pub struct Fundamentals {
    pub pe_ratio: Option<f64>,
    pub profit_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn fundamentals(&self, isin: &Isin) -> SentinelResult<Fundamentals>;
}

#[async_trait]
pub trait ExchangeCalendar: Send + Sync {
    async fn is_open_at(&self, mic: Mic, at: DateTime<Utc>) -> SentinelResult<bool>;
    async fn next_open(&self, mic: Mic, at: DateTime<Utc>) -> SentinelResult<DateTime<Utc>>;
    async fn next_close(&self, mic: Mic, at: DateTime<Utc>) -> SentinelResult<DateTime<Utc>>;
    async fn holidays(&self, mic: Mic, year: i32) -> SentinelResult<Vec<NaiveDate>>;
}
