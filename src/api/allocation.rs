//! `/api/allocation/*` (spec §6 "Portfolio & allocation" family).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::container::Container;
use crate::domain::security::{GroupKind, GroupTarget};

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

fn group_weights(
    snapshot: &crate::domain::portfolio::PortfolioSnapshot,
    securities: &HashMap<String, crate::domain::security::Security>,
    group_of: impl Fn(&crate::domain::security::Security) -> String,
) -> HashMap<String, f64> {
    let total = snapshot.total_value_eur();
    if total.is_zero() {
        return HashMap::new();
    }
    let mut by_group: HashMap<String, rust_decimal::Decimal> = HashMap::new();
    for position in snapshot.current_positions() {
        if let Some(security) = securities.get(position.isin.as_str()) {
            *by_group.entry(group_of(security)).or_default() += position.market_value_eur;
        }
    }
    by_group.into_iter().map(|(k, v)| (k, (v / total).to_f64().unwrap_or(0.0))).collect()
}

pub async fn current(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    Ok(Json(json!({
        "total_value_eur": snapshot.total_value_eur(),
        "position_count": snapshot.current_positions().count(),
    })))
}

async fn security_map(container: &Container) -> crate::domain::errors::SentinelResult<HashMap<String, crate::domain::security::Security>> {
    Ok(container.securities.all().await?.into_iter().map(|s| (s.isin.to_string(), s)).collect())
}

pub async fn group_by_kind(State(container): State<Arc<Container>>, Path(kind): Path<String>) -> ApiResult<Json<Value>> {
    let parsed: GroupKind = kind.parse()?;
    let snapshot = load_snapshot(&container).await?;
    let securities = security_map(&container).await?;
    let weights = match parsed {
        GroupKind::Country => group_weights(&snapshot, &securities, |s| s.country.clone()),
        GroupKind::Industry => group_weights(&snapshot, &securities, |s| s.industry.clone()),
    };
    Ok(Json(json!({"kind": kind, "weights": weights})))
}

pub async fn targets(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let all = container.group_targets.all().await?;
    Ok(Json(json!({"targets": all})))
}

pub async fn vs_targets(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let securities = security_map(&container).await?;
    let targets = container.group_targets.all().await?;
    let country_current = group_weights(&snapshot, &securities, |s| s.country.clone());
    let country_target = crate::domain::security::normalize_targets(&targets, GroupKind::Country);
    let industry_current = group_weights(&snapshot, &securities, |s| s.industry.clone());
    let industry_target = crate::domain::security::normalize_targets(&targets, GroupKind::Industry);
    Ok(Json(json!({
        "country": {"current": country_current, "target": country_target},
        "industry": {"current": industry_current, "target": industry_target},
    })))
}

pub async fn deviations(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let securities = security_map(&container).await?;
    let targets = container.group_targets.all().await?;
    let current = group_weights(&snapshot, &securities, |s| s.country.clone());
    let target = crate::domain::security::normalize_targets(&targets, GroupKind::Country);
    let mut deviations = HashMap::new();
    let mut names: Vec<&String> = current.keys().chain(target.keys()).collect();
    names.sort();
    names.dedup();
    for name in names {
        let c = current.get(name).copied().unwrap_or(0.0);
        let t = target.get(name).copied().unwrap_or(0.0);
        deviations.insert(name.clone(), c - t);
    }
    Ok(Json(json!({"country_deviation": deviations})))
}

#[derive(Deserialize)]
pub struct SetTargetRequest {
    pub name: String,
    pub target_weight: f64,
}

pub async fn put_group_target(
    State(container): State<Arc<Container>>,
    Path(kind): Path<String>,
    Json(body): Json<SetTargetRequest>,
) -> ApiResult<Json<Value>> {
    let parsed: GroupKind = kind.parse()?;
    container
        .group_targets
        .upsert(&GroupTarget { kind: parsed, name: body.name.clone(), target_weight: body.target_weight })
        .await?;
    container.events.publish(crate::domain::event::Event::new(
        crate::domain::event::EventKind::AllocationTargetsChanged,
        "api_allocation",
        crate::domain::event::EventPayload::Empty,
    ));
    Ok(Json(json!({"kind": kind, "name": body.name, "target_weight": body.target_weight})))
}

pub async fn delete_group_target(
    State(container): State<Arc<Container>>,
    Path((kind, name)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    container.group_targets.delete(&kind, &name).await?;
    container.events.publish(crate::domain::event::Event::new(
        crate::domain::event::EventKind::AllocationTargetsChanged,
        "api_allocation",
        crate::domain::event::EventPayload::Empty,
    ));
    Ok(Json(json!({"deleted": true})))
}
