//! `/api/planning/*` (spec §6 "Planning" family). The planning batch itself
//! runs as the `planner-batch` job (container.rs); these handlers surface
//! its configuration, status, and latest output, and let a manual batch or
//! execution be requested on demand.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::application::scheduler::registry::PLANNER_BATCH;
use crate::domain::errors::{SentinelError, SentinelResult};
use crate::domain::ledger::TradeSource;
use crate::domain::trading::TradeProposal;
use crate::container::Container;

use super::error::ApiResult;

async fn load_snapshot(container: &Container) -> SentinelResult<crate::domain::portfolio::PortfolioSnapshot> {
    let mut snapshot = crate::domain::portfolio::PortfolioSnapshot::default();
    for p in container.positions.all().await? {
        snapshot.positions.insert(p.isin.clone(), p);
    }
    for c in container.cash.all().await? {
        snapshot.cash.insert(c.currency.clone(), c);
    }
    Ok(snapshot)
}

pub async fn get_config(State(container): State<Arc<Container>>) -> Json<Value> {
    let planner = &container.config.planner;
    Json(json!({
        "max_depth": planner.max_depth,
        "max_sequences": planner.max_sequences,
        "evaluation_fan_out": planner.evaluation_fan_out,
        "commission_fixed": planner.commission_fixed,
        "commission_pct": planner.commission_pct,
        "slippage": planner.slippage,
        "requires_market_hours": planner.requires_market_hours,
        "concentration_limit": planner.concentration_limit,
    }))
}

#[derive(Deserialize)]
pub struct ConfigUpdateRequest {
    pub max_depth: Option<usize>,
    pub max_sequences: Option<usize>,
    pub evaluation_fan_out: Option<usize>,
    pub concentration_limit: Option<f64>,
}

fn validate_config_update(body: &ConfigUpdateRequest) -> SentinelResult<()> {
    if let Some(d) = body.max_depth {
        if d == 0 {
            return Err(SentinelError::validation("max_depth must be >= 1"));
        }
    }
    if let Some(n) = body.max_sequences {
        if n == 0 {
            return Err(SentinelError::validation("max_sequences must be >= 1"));
        }
    }
    if let Some(f) = body.evaluation_fan_out {
        if f == 0 {
            return Err(SentinelError::validation("evaluation_fan_out must be >= 1"));
        }
    }
    if let Some(limit) = body.concentration_limit {
        if !(0.0..=1.0).contains(&limit) {
            return Err(SentinelError::validation("concentration_limit must be in [0, 1]"));
        }
    }
    Ok(())
}

/// The planner config is sourced once from the environment at startup
/// (`config::planner_config`) and has no backing settings store, so this
/// only validates a candidate update — it never mutates the running config.
pub async fn put_config(Json(body): Json<ConfigUpdateRequest>) -> ApiResult<Json<Value>> {
    validate_config_update(&body)?;
    Err(SentinelError::new(
        crate::domain::errors::ErrorKind::NotImplemented,
        "planner config is environment-sourced at startup; restart with the relevant SENTINEL_PLANNER_* variable set",
    )
    .into())
}

pub async fn validate_config(Json(body): Json<ConfigUpdateRequest>) -> ApiResult<Json<Value>> {
    match validate_config_update(&body) {
        Ok(()) => Ok(Json(json!({"valid": true}))),
        Err(err) => Ok(Json(json!({"valid": false, "reason": err.message}))),
    }
}

pub async fn status(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let recent = container.jobs.recent(20).await?;
    let last_batch = recent.into_iter().find(|j| j.name == PLANNER_BATCH);
    let snapshot = container.metrics.snapshot();
    Ok(Json(json!({
        "active_planner_runs": snapshot.active_planner_runs,
        "last_batch": last_batch,
    })))
}

pub async fn recommendations(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let targets = container.group_targets.all().await?;
    let hash = crate::domain::hash::portfolio_hash(&snapshot, &targets);
    let plan = container.plans.best_for(&hash).await?;
    Ok(Json(json!({"portfolio_hash": hash, "plan": plan})))
}

pub async fn trigger_recommendations(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    container.scheduler.trigger_manual(PLANNER_BATCH).await?;
    Ok(Json(json!({"triggered": PLANNER_BATCH})))
}

pub async fn batch(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    container.scheduler.trigger_manual(PLANNER_BATCH).await?;
    Ok(Json(json!({"triggered": PLANNER_BATCH})))
}

/// Executes the current winning plan's steps in order through the trade
/// pipeline (spec §4.9). Refuses to run against a plan whose
/// `portfolio_hash` no longer matches live state (P3): a stale plan was
/// computed against positions that have since changed.
pub async fn execute(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let mut snapshot = load_snapshot(&container).await?;
    let targets = container.group_targets.all().await?;
    let hash = crate::domain::hash::portfolio_hash(&snapshot, &targets);
    let plan = container
        .plans
        .best_for(&hash)
        .await?
        .ok_or_else(|| SentinelError::not_found("no plan exists for the current portfolio state; run a batch first"))?;

    let mut executed = Vec::new();
    for step in &plan.sequence.steps {
        let proposal = TradeProposal {
            isin: step.isin.clone(),
            symbol: step.symbol.clone(),
            side: step.side,
            quantity: step.quantity,
            expected_price: None,
        };
        let trade = container
            .trade_execution
            .execute(proposal, &snapshot, crate::domain::ledger::TradingMode::Live, TradeSource::Plan, false)
            .await?;
        apply_fill(&mut snapshot, &trade);
        executed.push(trade);
    }
    Ok(Json(json!({"executed": executed})))
}

/// Keeps the in-memory snapshot in step with each fill so later steps in
/// the same plan see the cash/position effect of earlier ones, without a
/// full portfolio re-sync between every trade.
fn apply_fill(snapshot: &mut crate::domain::portfolio::PortfolioSnapshot, trade: &crate::domain::ledger::Trade) {
    let delta = match trade.side {
        crate::domain::ledger::Side::Buy => -trade.value_eur,
        crate::domain::ledger::Side::Sell => trade.value_eur,
    };
    if let Some(cash) = snapshot.cash.get_mut("EUR") {
        cash.amount += delta;
    }
    if let Some(position) = snapshot.positions.get_mut(&trade.isin) {
        let signed_qty: Decimal = match trade.side {
            crate::domain::ledger::Side::Buy => trade.quantity,
            crate::domain::ledger::Side::Sell => -trade.quantity,
        };
        position.quantity += signed_qty;
    }
}

pub async fn stream(State(container): State<Arc<Container>>) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let sub = container.events.subscribe();
    let events = stream::unfold(sub, |mut sub| async move {
        loop {
            let event = sub.recv().await?;
            if matches!(
                event.kind,
                crate::domain::event::EventKind::PlanningStatusUpdated
                    | crate::domain::event::EventKind::RecommendationsReady
                    | crate::domain::event::EventKind::PlanGenerated
            ) {
                let payload = serde_json::to_string(&*event).unwrap_or_default();
                return Some((Ok(SseEvent::default().event("planning").data(payload)), sub));
            }
        }
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
