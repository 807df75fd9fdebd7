//! `/api/rebalancing/*` (spec §6 "Rebalancing" family) — read-only views
//! over the country-allocation rebalance calculators (spec §4.7).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::application::opportunity::calculators;
use crate::container::Container;
use crate::domain::security::GroupKind;

use super::error::ApiResult;

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

async fn security_map(container: &Container) -> crate::domain::errors::SentinelResult<HashMap<String, crate::domain::security::Security>> {
    Ok(container.securities.all().await?.into_iter().map(|s| (s.isin.to_string(), s)).collect())
}

fn country_weights(
    snapshot: &crate::domain::portfolio::PortfolioSnapshot,
    securities: &HashMap<String, crate::domain::security::Security>,
) -> HashMap<String, f64> {
    use rust_decimal::prelude::ToPrimitive;
    let total = snapshot.total_value_eur();
    if total.is_zero() {
        return HashMap::new();
    }
    let mut by_country: HashMap<String, rust_decimal::Decimal> = HashMap::new();
    for position in snapshot.current_positions() {
        if let Some(security) = securities.get(position.isin.as_str()) {
            *by_country.entry(security.country.clone()).or_default() += position.market_value_eur;
        }
    }
    by_country.into_iter().map(|(k, v)| (k, (v / total).to_f64().unwrap_or(0.0))).collect()
}

/// The rebalance trigger condition is fixed, not configurable: a sell
/// candidate fires when a group's current weight exceeds its target, a buy
/// candidate when it falls short (spec §4.7, `calculators::rebalance_sells`/`rebalance_buys`).
pub async fn triggers() -> Json<Value> {
    Json(json!({
        "sell_trigger": "current_weight > target_weight",
        "buy_trigger": "current_weight < target_weight",
    }))
}

pub async fn min_trade_amount(State(container): State<Arc<Container>>) -> Json<Value> {
    Json(json!({"min_trade_amount_eur": container.opportunity_service.config().lot_value_eur}))
}

pub async fn calculate(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let securities = security_map(&container).await?;
    let targets = container.group_targets.all().await?;
    let current = country_weights(&snapshot, &securities);
    let target = crate::domain::security::normalize_targets(&targets, GroupKind::Country);

    let sells = calculators::rebalance_sells(&snapshot, &securities, &current, &target, |s| Some(s.country.clone()));
    let lot_value = container.opportunity_service.config().lot_value_eur;
    let buys = calculators::rebalance_buys(&securities, &current, &target, |s| Some(s.country.clone()), lot_value);

    Ok(Json(json!({"sells": sells, "buys": buys})))
}

pub async fn calculate_target_weights(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let targets = container.group_targets.all().await?;
    let country = crate::domain::security::normalize_targets(&targets, GroupKind::Country);
    let industry = crate::domain::security::normalize_targets(&targets, GroupKind::Industry);
    Ok(Json(json!({"country": country, "industry": industry})))
}

/// The calculators are pure functions that only propose candidates without
/// touching the ledger, so "simulate" and "calculate" return the same
/// result — nothing here ever places an order.
pub async fn simulate_rebalance(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    calculate(State(container)).await
}

pub async fn negative_balance_check(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let negative = container.portfolio_service.negative_balances().await?;
    Ok(Json(json!({"negative_currencies": negative})))
}
