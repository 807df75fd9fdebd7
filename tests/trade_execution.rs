//! End-to-end coverage of the trade execution pipeline: a research-mode
//! refusal, an insufficient-cash refusal, a successful BUY that reaches the
//! ledger and the event bus, and the append-only guarantee on the trade
//! ledger. Mocks follow the teacher's `tests/drawdown_integration.rs` style:
//! plain structs implementing the port traits directly rather than a mocking
//! framework.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use sentinel::application::market_hours::MarketHoursService;
use sentinel::application::trading::service::{TradeExecutionConfig, TradeExecutionService};
use sentinel::domain::errors::{ErrorKind, SentinelResult};
use sentinel::domain::event::{EventKind, EventPayload};
use sentinel::domain::history::PriceBar;
use sentinel::domain::ids::Isin;
use sentinel::domain::ledger::{CashFlow, Side, Trade, TradeSource, TradingMode};
use sentinel::domain::market_hours::Mic;
use sentinel::domain::portfolio::{CashBalance, PortfolioSnapshot};
use sentinel::domain::ports::{BrokerClient, ExchangeCalendar, FxSource, OrderAck, OrderRequest};
use sentinel::domain::repositories::{SecurityRepository, TradeRepository};
use sentinel::domain::security::{ProductType, Security};
use sentinel::domain::trading::TradeProposal;
use sentinel::infrastructure::event_bus::EventBus;

struct MockBroker {
    quote: Decimal,
    accepted_price: Decimal,
}

#[async_trait]
impl BrokerClient for MockBroker {
    async fn place_order(&self, order: OrderRequest) -> SentinelResult<OrderAck> {
        Ok(OrderAck {
            order_id: format!("ord-{}", order.isin),
            accepted_price: self.accepted_price,
        })
    }
    async fn positions(&self) -> SentinelResult<Vec<sentinel::domain::portfolio::Position>> {
        Ok(vec![])
    }
    async fn cash_balances(&self) -> SentinelResult<Vec<CashBalance>> {
        Ok(vec![])
    }
    async fn cash_movements(&self, _from: DateTime<Utc>, _to: DateTime<Utc>) -> SentinelResult<Vec<CashFlow>> {
        Ok(vec![])
    }
    async fn executed_trades(&self, _from: DateTime<Utc>, _to: DateTime<Utc>) -> SentinelResult<Vec<Trade>> {
        Ok(vec![])
    }
    async fn quote(&self, _symbol: &str) -> SentinelResult<Decimal> {
        Ok(self.quote)
    }
    async fn historical_ohlc(
        &self,
        _isin: &Isin,
        _symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> SentinelResult<Vec<PriceBar>> {
        Ok(vec![])
    }
    async fn connected(&self) -> (bool, Option<DateTime<Utc>>) {
        (true, Some(Utc::now()))
    }
}

struct MockSecurities {
    security: Security,
}

#[async_trait]
impl SecurityRepository for MockSecurities {
    async fn upsert(&self, _security: &Security) -> SentinelResult<()> {
        Ok(())
    }
    async fn find(&self, isin: &Isin) -> SentinelResult<Option<Security>> {
        if *isin == self.security.isin {
            Ok(Some(self.security.clone()))
        } else {
            Ok(None)
        }
    }
    async fn all_active(&self) -> SentinelResult<Vec<Security>> {
        Ok(vec![self.security.clone()])
    }
    async fn all(&self) -> SentinelResult<Vec<Security>> {
        Ok(vec![self.security.clone()])
    }
    async fn set_active(&self, _isin: &Isin, _active: bool) -> SentinelResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MockTrades {
    rows: Mutex<Vec<Trade>>,
}

#[async_trait]
impl TradeRepository for MockTrades {
    async fn append(&self, trade: &Trade) -> SentinelResult<Trade> {
        let mut rows = self.rows.lock().unwrap();
        let mut stored = trade.clone();
        stored.id = rows.len() as i64 + 1;
        rows.push(stored.clone());
        Ok(stored)
    }
    async fn recent(&self, limit: usize) -> SentinelResult<Vec<Trade>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }
    async fn all(&self) -> SentinelResult<Vec<Trade>> {
        Ok(self.rows.lock().unwrap().clone())
    }
    async fn find_by_order_id(&self, order_id: &str) -> SentinelResult<Option<Trade>> {
        Ok(self.rows.lock().unwrap().iter().find(|t| t.order_id == order_id).cloned())
    }
}

struct FixedFx {
    rate: Decimal,
}

#[async_trait]
impl FxSource for FixedFx {
    async fn current_rate(&self, _from: &str, _to: &str) -> SentinelResult<Decimal> {
        Ok(self.rate)
    }
    async fn historical_rate(&self, _from: &str, _to: &str, _date: NaiveDate) -> SentinelResult<Decimal> {
        Ok(self.rate)
    }
}

struct AlwaysOpenCalendar;

#[async_trait]
impl ExchangeCalendar for AlwaysOpenCalendar {
    async fn is_open_at(&self, _mic: Mic, _at: DateTime<Utc>) -> SentinelResult<bool> {
        Ok(true)
    }
    async fn next_open(&self, _mic: Mic, at: DateTime<Utc>) -> SentinelResult<DateTime<Utc>> {
        Ok(at)
    }
    async fn next_close(&self, _mic: Mic, at: DateTime<Utc>) -> SentinelResult<DateTime<Utc>> {
        Ok(at + chrono::Duration::hours(1))
    }
    async fn holidays(&self, _mic: Mic, _year: i32) -> SentinelResult<Vec<NaiveDate>> {
        Ok(vec![])
    }
}

fn security(isin: &str, currency: &str) -> Security {
    Security {
        isin: Isin::parse(isin).unwrap(),
        symbol: "AAPL".into(),
        name: "Apple Inc".into(),
        exchange_code: "XNYS".into(),
        currency: currency.into(),
        country: "US".into(),
        industry: "Technology".into(),
        product_type: ProductType::Equity,
        min_lot: Decimal::ONE,
        active: true,
        allow_buy: true,
        allow_sell: true,
        tags: HashSet::new(),
        last_synced: Some(Utc::now()),
    }
}

fn snapshot_with_cash(currency: &str, amount: Decimal) -> PortfolioSnapshot {
    let mut snapshot = PortfolioSnapshot::default();
    snapshot.cash.insert(
        currency.to_string(),
        CashBalance {
            currency: currency.to_string(),
            amount,
        },
    );
    snapshot
}

struct Harness {
    service: TradeExecutionService,
    events: Arc<EventBus>,
    trades: Arc<MockTrades>,
}

fn build_harness(security: Security, fx_rate: Decimal, quote: Decimal) -> Harness {
    let calendar = Arc::new(AlwaysOpenCalendar);
    let market_hours = Arc::new(MarketHoursService::new(calendar));
    let events = Arc::new(EventBus::new());
    let trades = Arc::new(MockTrades::default());
    let service = TradeExecutionService::new(
        Arc::new(MockBroker {
            quote,
            accepted_price: quote,
        }),
        Arc::new(MockSecurities { security }),
        trades.clone(),
        Arc::new(FixedFx { rate: fx_rate }),
        market_hours,
        events.clone(),
        TradeExecutionConfig::default(),
    );
    Harness { service, events, trades }
}

fn buy_proposal(isin: &str, quantity: Decimal, price: Decimal) -> TradeProposal {
    TradeProposal {
        isin: Isin::parse(isin).unwrap(),
        symbol: "AAPL".into(),
        side: Side::Buy,
        quantity,
        expected_price: Some(price),
    }
}

const ISIN: &str = "US0378331005";

#[tokio::test]
async fn research_mode_buy_is_refused() {
    let harness = build_harness(security(ISIN, "EUR"), Decimal::ONE, dec!(150));
    let snapshot = snapshot_with_cash("EUR", dec!(100_000));
    let proposal = buy_proposal(ISIN, dec!(10), dec!(150));

    let err = harness
        .service
        .execute(proposal, &snapshot, TradingMode::Research, TradeSource::Manual, false)
        .await
        .expect_err("research mode must refuse a live-account BUY");

    assert!(err.message.contains("research mode"));
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(err.layer, Some("mode_gate"));
    assert!(harness.trades.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn buy_with_insufficient_cash_is_refused() {
    let harness = build_harness(security(ISIN, "USD"), dec!(0.92), dec!(150));
    // notional = 10 * 150 = 1500 USD; required = 1500 * 0.92 + (2 + 0.002*1500) = 1385 EUR.
    let snapshot = snapshot_with_cash("EUR", dec!(1000));
    let proposal = buy_proposal(ISIN, dec!(10), dec!(150));

    let err = harness
        .service
        .execute(proposal, &snapshot, TradingMode::Live, TradeSource::Manual, false)
        .await
        .expect_err("1000 EUR must not cover a 1385 EUR requirement");

    assert!(err.message.contains("insufficient"), "unexpected message: {}", err.message);
    assert_eq!(err.kind, ErrorKind::InsufficientFunds);
    assert_eq!(err.reason.as_deref(), Some("insufficient_funds"));
    assert_eq!(err.layer, Some("cash_sufficiency"));
    assert!(err.details.is_some());
    assert!(harness.trades.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn valid_buy_appends_to_the_ledger_and_publishes_an_event() {
    let harness = build_harness(security(ISIN, "EUR"), Decimal::ONE, dec!(150));
    let mut sub = harness.events.subscribe();
    let snapshot = snapshot_with_cash("EUR", dec!(5000));
    let proposal = buy_proposal(ISIN, dec!(10), dec!(150));

    let trade = harness
        .service
        .execute(proposal, &snapshot, TradingMode::Live, TradeSource::Manual, false)
        .await
        .expect("a funded live BUY within limits must succeed");

    assert_eq!(trade.side, Side::Buy);
    assert_eq!(trade.quantity, dec!(10));
    assert_eq!(trade.price, dec!(150));
    // notional 1500 + commission (2 + 0.002*1500 = 5) = 1505, well under the 5000 available.
    assert_eq!(trade.value_eur, dec!(1500));

    let stored = harness.trades.all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].order_id, trade.order_id);

    let event = sub.recv().await.expect("TradeExecuted must be published");
    assert_eq!(event.kind, EventKind::TradeExecuted);
    match &event.payload {
        EventPayload::TradeExecuted { trade: published } => assert_eq!(published.order_id, trade.order_id),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn ledger_append_never_mutates_prior_rows() {
    let harness = build_harness(security(ISIN, "EUR"), Decimal::ONE, dec!(150));

    let first = harness
        .service
        .execute(
            buy_proposal(ISIN, dec!(5), dec!(150)),
            &snapshot_with_cash("EUR", dec!(5000)),
            TradingMode::Live,
            TradeSource::Manual,
            false,
        )
        .await
        .unwrap();

    let second = harness
        .service
        .execute(
            buy_proposal(ISIN, dec!(3), dec!(150)),
            &snapshot_with_cash("EUR", dec!(5000)),
            TradingMode::Live,
            TradeSource::Manual,
            false,
        )
        .await
        .unwrap();

    let rows = harness.trades.all().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, first.id);
    assert_eq!(rows[0].quantity, first.quantity);
    assert_eq!(rows[1].id, second.id);
    assert_eq!(rows[1].quantity, second.quantity);
    assert_ne!(rows[0].id, rows[1].id);
}
