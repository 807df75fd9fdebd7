//! `/api/currency/*` (spec §6 "Currency" family). A single direct-rate
//! `FxSource` is configured (spec §1: FX vendor integration out of scope),
//! so "fallback chain" and "sources" here describe that one hop honestly
//! rather than simulating a multi-vendor pipeline that doesn't exist.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::container::Container;
use crate::domain::errors::SentinelError;

use super::error::ApiResult;

pub async fn balances(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let balances = container.cash.all().await?;
    Ok(Json(json!({"balances": balances})))
}

pub async fn available_currencies(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let mut currencies: HashSet<String> = container.cash.all().await?.into_iter().map(|c| c.currency).collect();
    for security in container.securities.all().await? {
        currencies.insert(security.currency);
    }
    let mut currencies: Vec<String> = currencies.into_iter().collect();
    currencies.sort();
    Ok(Json(json!({"currencies": currencies})))
}

pub async fn conversion_path(
    State(container): State<Arc<Container>>,
    Path((from, to)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let rate = container.fx_source.current_rate(&from, &to).await?;
    Ok(Json(json!({"from": from, "to": to, "hops": [from, to], "rate": rate})))
}

pub async fn rates_fallback_chain(Path((from, to)): Path<(String, String)>) -> Json<Value> {
    Json(json!({"from": from, "to": to, "chain": ["direct"]}))
}

pub async fn rates_sources() -> Json<Value> {
    Json(json!({"sources": ["static"]}))
}

pub async fn rates_staleness(State(container): State<Arc<Container>>, Path((from, to)): Path<(String, String)>) -> ApiResult<Json<Value>> {
    let latest = container.fx_rates.latest(&from, &to).await?;
    let stale_days = latest.as_ref().map(|r| (chrono::Utc::now().date_naive() - r.date).num_days());
    Ok(Json(json!({"from": from, "to": to, "latest": latest, "stale_days": stale_days})))
}

#[derive(Deserialize)]
pub struct BalanceCheckRequest {
    pub currency: String,
    pub amount: Decimal,
}

pub async fn balance_check(State(container): State<Arc<Container>>, Json(body): Json<BalanceCheckRequest>) -> ApiResult<Json<Value>> {
    let balances = container.cash.all().await?;
    let available = balances
        .iter()
        .find(|b| b.currency == body.currency)
        .map(|b| b.amount)
        .unwrap_or(Decimal::ZERO);
    Ok(Json(json!({"sufficient": available >= body.amount, "available": available})))
}

#[derive(Deserialize)]
pub struct ConversionRequirementsRequest {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

pub async fn conversion_requirements(
    State(container): State<Arc<Container>>,
    Json(body): Json<ConversionRequirementsRequest>,
) -> ApiResult<Json<Value>> {
    let rate = container.fx_source.current_rate(&body.from, &body.to).await?;
    Ok(Json(json!({"rate": rate, "converted_amount": body.amount * rate})))
}

#[derive(Deserialize)]
pub struct ConvertRequest {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

/// This is a dry-run conversion quote, not a funds movement — the broker
/// integration does not expose an FX-conversion order type (spec §1).
pub async fn convert(State(container): State<Arc<Container>>, Json(body): Json<ConvertRequest>) -> ApiResult<Json<Value>> {
    if body.amount <= Decimal::ZERO {
        return Err(SentinelError::validation("amount must be positive").into());
    }
    let rate = container.fx_source.current_rate(&body.from, &body.to).await?;
    Ok(Json(json!({"rate": rate, "converted_amount": body.amount * rate})))
}

/// FX rates are refreshed as part of the securities-data sync (the same
/// job upserts currency rates for every non-EUR currency in the active
/// universe), so that's what a manual rate sync triggers.
pub async fn sync_rates(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    use crate::application::scheduler::registry::SYNC_SECURITIES_DATA;
    container.scheduler.trigger_manual(SYNC_SECURITIES_DATA).await?;
    Ok(Json(json!({"triggered": SYNC_SECURITIES_DATA})))
}
