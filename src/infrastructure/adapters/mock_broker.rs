//! In-memory broker adapter. Real broker connectivity is explicitly out of
//! scope (spec §1 Non-goals); this implements `BrokerClient` against an
//! internal ledger so the rest of the system can be driven end-to-end in
//! research mode without a live account.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::SentinelResult;
use crate::domain::history::PriceBar;
use crate::domain::ids::Isin;
use crate::domain::ledger::{CashFlow, Trade, TradeSource, TradingMode};
use crate::domain::ports::{BrokerClient, OrderAck, OrderRequest};
use crate::domain::portfolio::{CashBalance, Position};

pub struct MockBrokerClient {
    positions: RwLock<HashMap<Isin, Position>>,
    cash: RwLock<HashMap<String, CashBalance>>,
    fills: RwLock<Vec<Trade>>,
    next_trade_id: AtomicU64,
    connected_since: DateTime<Utc>,
}

impl MockBrokerClient {
    pub fn new(starting_cash_eur: Decimal) -> Self {
        let mut cash = HashMap::new();
        cash.insert(
            "EUR".to_string(),
            CashBalance {
                currency: "EUR".to_string(),
                amount: starting_cash_eur,
            },
        );
        Self {
            positions: RwLock::new(HashMap::new()),
            cash: RwLock::new(cash),
            fills: RwLock::new(Vec::new()),
            next_trade_id: AtomicU64::new(1),
            connected_since: Utc::now(),
        }
    }
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    async fn place_order(&self, order: OrderRequest) -> SentinelResult<OrderAck> {
        let price = order.limit_price.unwrap_or(Decimal::ONE);
        let order_id = Uuid::new_v4().to_string();
        let id = self.next_trade_id.fetch_add(1, Ordering::Relaxed) as i64;

        let trade = Trade {
            id,
            isin: order.isin.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            currency: "EUR".to_string(),
            currency_rate: Decimal::ONE,
            value_eur: price * order.quantity,
            executed_at: Utc::now(),
            order_id: order_id.clone(),
            source: TradeSource::Manual,
            mode: TradingMode::Research,
            bucket_id: None,
        };
        self.fills.write().await.push(trade);

        Ok(OrderAck {
            order_id,
            accepted_price: price,
        })
    }

    async fn positions(&self) -> SentinelResult<Vec<Position>> {
        Ok(self.positions.read().await.values().cloned().collect())
    }

    async fn cash_balances(&self) -> SentinelResult<Vec<CashBalance>> {
        Ok(self.cash.read().await.values().cloned().collect())
    }

    async fn cash_movements(&self, _from: DateTime<Utc>, _to: DateTime<Utc>) -> SentinelResult<Vec<CashFlow>> {
        Ok(Vec::new())
    }

    async fn executed_trades(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> SentinelResult<Vec<Trade>> {
        let fills = self.fills.read().await;
        Ok(fills
            .iter()
            .filter(|t| t.executed_at >= from && t.executed_at <= to)
            .cloned()
            .collect())
    }

    async fn quote(&self, _symbol: &str) -> SentinelResult<Decimal> {
        Ok(Decimal::ONE)
    }

    async fn historical_ohlc(
        &self,
        _isin: &Isin,
        _symbol: &str,
        _start: chrono::NaiveDate,
        _end: chrono::NaiveDate,
    ) -> SentinelResult<Vec<PriceBar>> {
        Ok(Vec::new())
    }

    async fn connected(&self) -> (bool, Option<DateTime<Utc>>) {
        (true, Some(self.connected_since))
    }
}
