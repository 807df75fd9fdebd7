//! C9: trade execution pipeline orchestration (spec §4.9). Runs the seven
//! validators, dispatches to the broker, and appends the resulting trade to
//! the ledger in one step — nothing is appended on broker failure.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::errors::{ErrorKind, SentinelError, SentinelResult};
use crate::domain::event::{Event, EventKind, EventPayload};
use crate::domain::ledger::{Trade, TradeSource, TradingMode};
use crate::domain::market_hours::Mic;
use crate::domain::ports::{BrokerClient, BrokerFailureClass, FxSource, OrderRequest};
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::repositories::{SecurityRepository, TradeRepository};
use crate::domain::trading::{TradeProposal, ValidationContext, ValidationOutcome, ValidationPipeline};
use crate::infrastructure::event_bus::EventBus;

use super::commission::CommissionSchedule;
use super::limit_price;
use super::validators::default_pipeline;

use crate::application::market_hours::MarketHoursService;

const MODULE: &str = "trading";
const ACCOUNT_CURRENCY: &str = "EUR";

pub struct TradeExecutionConfig {
    pub commission: CommissionSchedule,
    pub slippage: Decimal,
    pub requires_market_hours: bool,
    pub concentration_limit: Option<f64>,
}

impl Default for TradeExecutionConfig {
    fn default() -> Self {
        Self {
            commission: CommissionSchedule::default(),
            slippage: limit_price::DEFAULT_SLIPPAGE,
            requires_market_hours: true,
            concentration_limit: None,
        }
    }
}

pub struct TradeExecutionService {
    broker: Arc<dyn BrokerClient>,
    securities: Arc<dyn SecurityRepository>,
    trades: Arc<dyn TradeRepository>,
    fx: Arc<dyn FxSource>,
    market_hours: Arc<MarketHoursService>,
    events: Arc<EventBus>,
    config: TradeExecutionConfig,
}

impl TradeExecutionService {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        securities: Arc<dyn SecurityRepository>,
        trades: Arc<dyn TradeRepository>,
        fx: Arc<dyn FxSource>,
        market_hours: Arc<MarketHoursService>,
        events: Arc<EventBus>,
        config: TradeExecutionConfig,
    ) -> Self {
        Self {
            broker,
            securities,
            trades,
            fx,
            market_hours,
            events,
            config,
        }
    }

    pub async fn execute(
        &self,
        proposal: TradeProposal,
        snapshot: &PortfolioSnapshot,
        mode: TradingMode,
        source: TradeSource,
        use_limit: bool,
    ) -> SentinelResult<Trade> {
        let security = self
            .securities
            .find(&proposal.isin)
            .await?
            .ok_or_else(|| SentinelError::not_found(format!("unknown security {}", proposal.isin)))?;

        let current_price = match proposal.expected_price {
            Some(p) => p,
            None => self.broker.quote(&proposal.symbol).await?,
        };

        let market_open = match Mic::parse(&security.exchange_code) {
            Some(mic) => self.market_hours.status(mic).await?.open,
            None => true,
        };

        let fx_rate_to_account = if security.currency == ACCOUNT_CURRENCY {
            Decimal::ONE
        } else {
            self.fx.current_rate(&security.currency, ACCOUNT_CURRENCY).await?
        };

        let notional = current_price * proposal.quantity;
        let commission = self.config.commission.calculate(notional);

        let ctx = ValidationContext {
            proposal: &proposal,
            security: &security,
            snapshot,
            mode,
            current_price,
            account_currency: ACCOUNT_CURRENCY.to_string(),
            fx_rate_to_account,
            commission,
            market_open,
            concentration_limit: self.config.concentration_limit,
        };

        let pipeline = ValidationPipeline::new(default_pipeline(
            self.config.requires_market_hours,
            self.config.concentration_limit.is_some(),
        ));
        let report = pipeline.validate(&ctx).await;
        for w in &report.warnings {
            warn!(isin = %proposal.isin, warning = %w, "trade validation warning");
        }
        if let ValidationOutcome::Deny(reason) = report.outcome {
            return Err(reason);
        }

        let limit = if use_limit {
            Some(limit_price::limit_price(current_price, proposal.side, self.config.slippage))
        } else {
            None
        };

        let order = OrderRequest {
            isin: proposal.isin.clone(),
            symbol: proposal.symbol.clone(),
            side: proposal.side,
            quantity: proposal.quantity,
            limit_price: limit,
        };

        let ack = self.broker.place_order(order).await.map_err(|e| {
            let class = classify_broker_error(&e);
            warn!(isin = %proposal.isin, ?class, error = %e, "broker rejected order");
            e
        })?;

        let value_eur = ack.accepted_price * proposal.quantity * fx_rate_to_account;
        let trade = Trade {
            id: 0,
            isin: proposal.isin.clone(),
            symbol: proposal.symbol.clone(),
            side: proposal.side,
            quantity: proposal.quantity,
            price: ack.accepted_price,
            currency: security.currency.clone(),
            currency_rate: fx_rate_to_account,
            value_eur,
            executed_at: Utc::now(),
            order_id: ack.order_id,
            source,
            mode,
            bucket_id: None,
        };

        let appended = self.trades.append(&trade).await?;

        info!(order_id = %appended.order_id, isin = %appended.isin, "trade executed");
        self.events.publish(Event::new(
            EventKind::TradeExecuted,
            MODULE,
            EventPayload::TradeExecuted {
                trade: Box::new(appended.clone()),
            },
        ));

        Ok(appended)
    }
}

fn classify_broker_error(err: &SentinelError) -> BrokerFailureClass {
    match err.kind {
        ErrorKind::BrokerTransient | ErrorKind::Timeout | ErrorKind::DependencyDown => BrokerFailureClass::Transient,
        ErrorKind::BrokerRejected | ErrorKind::Validation => BrokerFailureClass::Rejected,
        _ => BrokerFailureClass::Unknown,
    }
}
