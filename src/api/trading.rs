//! `/api/trades/*` and `/api/trade-validation/*` (spec §6 "Trading" family).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::application::trading::commission::CommissionSchedule;
use crate::application::trading::limit_price;
use crate::application::trading::validators::default_pipeline;
use crate::container::Container;
use crate::domain::errors::SentinelError;
use crate::domain::ids::Isin;
use crate::domain::ledger::{Side, TradeSource, TradingMode};
use crate::domain::market_hours::Mic;
use crate::domain::trading::{TradeProposal, ValidationContext, ValidationOutcome, ValidationPipeline};

use super::error::ApiResult;

const ACCOUNT_CURRENCY: &str = "EUR";

#[derive(Deserialize)]
pub struct TradesQuery {
    pub limit: Option<usize>,
}

pub async fn list(State(container): State<Arc<Container>>, Query(query): Query<TradesQuery>) -> ApiResult<Json<Value>> {
    let trades = container.trades.recent(query.limit.unwrap_or(100)).await?;
    Ok(Json(json!({"trades": trades})))
}

#[derive(Deserialize)]
pub struct ExecuteRequest {
    pub isin: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub expected_price: Option<Decimal>,
    #[serde(default)]
    pub use_limit: bool,
    #[serde(default)]
    pub mode: Option<TradingMode>,
}

async fn load_snapshot(container: &Container) -> crate::domain::errors::SentinelResult<crate::domain::portfolio::PortfolioSnapshot> {
    let mut snapshot = crate::domain::portfolio::PortfolioSnapshot::default();
    for p in container.positions.all().await? {
        snapshot.positions.insert(p.isin.clone(), p);
    }
    for c in container.cash.all().await? {
        snapshot.cash.insert(c.currency.clone(), c);
    }
    Ok(snapshot)
}

pub async fn execute(State(container): State<Arc<Container>>, Json(body): Json<ExecuteRequest>) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&body.isin)?;
    let snapshot = load_snapshot(&container).await?;
    let proposal = TradeProposal { isin, symbol: body.symbol, side: body.side, quantity: body.quantity, expected_price: body.expected_price };
    let trade = container
        .trade_execution
        .execute(proposal, &snapshot, body.mode.unwrap_or(TradingMode::Live), TradeSource::Manual, body.use_limit)
        .await?;
    Ok(Json(json!({"trade": trade})))
}

/// Builds the same `ValidationContext` `TradeExecutionService::execute`
/// would, but stops short of placing an order — shared by the three
/// dry-run endpoints below.
async fn dry_run(
    container: &Container,
    body: &ExecuteRequest,
) -> crate::domain::errors::SentinelResult<(Vec<String>, Vec<String>, Option<String>)> {
    let isin = Isin::parse(&body.isin)?;
    let security = container
        .securities
        .find(&isin)
        .await?
        .ok_or_else(|| SentinelError::not_found(format!("unknown security {isin}")))?;
    let snapshot = load_snapshot(container).await?;
    let proposal = TradeProposal {
        isin: isin.clone(),
        symbol: body.symbol.clone(),
        side: body.side,
        quantity: body.quantity,
        expected_price: body.expected_price,
    };

    let current_price = match body.expected_price {
        Some(p) => p,
        None => container.broker.quote(&body.symbol).await?,
    };
    let market_open = match Mic::parse(&security.exchange_code) {
        Some(mic) => container.market_hours.status(mic).await?.open,
        None => true,
    };
    let fx_rate_to_account = if security.currency == ACCOUNT_CURRENCY {
        Decimal::ONE
    } else {
        container.fx_source.current_rate(&security.currency, ACCOUNT_CURRENCY).await?
    };
    let commission = CommissionSchedule::default().calculate(current_price * proposal.quantity);

    let ctx = ValidationContext {
        proposal: &proposal,
        security: &security,
        snapshot: &snapshot,
        mode: body.mode.unwrap_or(TradingMode::Live),
        current_price,
        account_currency: ACCOUNT_CURRENCY.to_string(),
        fx_rate_to_account,
        commission,
        market_open,
        concentration_limit: None,
    };

    let pipeline = ValidationPipeline::new(default_pipeline(true, false));
    let report = pipeline.validate(&ctx).await;
    let deny = match report.outcome {
        ValidationOutcome::Deny(reason) => Some(reason.message),
        _ => None,
    };
    Ok((report.checked, report.warnings, deny))
}

pub async fn validate_trade(State(container): State<Arc<Container>>, Json(body): Json<ExecuteRequest>) -> ApiResult<Json<Value>> {
    let (checked, warnings, deny) = dry_run(&container, &body).await?;
    Ok(Json(json!({"checked": checked, "warnings": warnings, "denied_reason": deny, "passed": deny.is_none()})))
}

pub async fn check_eligibility(State(container): State<Arc<Container>>, Json(body): Json<ExecuteRequest>) -> ApiResult<Json<Value>> {
    let (checked, _warnings, deny) = dry_run(&container, &body).await?;
    let eligible = deny.is_none() || !deny.as_ref().is_some_and(|_| checked.contains(&"security_eligibility".to_string()));
    Ok(Json(json!({"eligible": eligible, "denied_reason": deny})))
}

pub async fn check_cash_sufficiency(State(container): State<Arc<Container>>, Json(body): Json<ExecuteRequest>) -> ApiResult<Json<Value>> {
    let (checked, _warnings, deny) = dry_run(&container, &body).await?;
    let sufficient = deny.is_none() || !checked.contains(&"cash_sufficiency".to_string());
    Ok(Json(json!({"cash_sufficient": sufficient, "denied_reason": deny})))
}

#[derive(Deserialize)]
pub struct CommissionRequest {
    pub notional: Decimal,
}

pub async fn calculate_commission(Json(body): Json<CommissionRequest>) -> Json<Value> {
    let commission = CommissionSchedule::default().calculate(body.notional);
    Json(json!({"commission": commission}))
}

#[derive(Deserialize)]
pub struct LimitPriceRequest {
    pub current_price: Decimal,
    pub side: Side,
    pub slippage: Option<Decimal>,
}

pub async fn calculate_limit_price(Json(body): Json<LimitPriceRequest>) -> Json<Value> {
    let price = limit_price::limit_price(body.current_price, body.side, body.slippage.unwrap_or(limit_price::DEFAULT_SLIPPAGE));
    Json(json!({"limit_price": price}))
}
