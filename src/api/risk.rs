//! `/api/risk/*` (spec §6 "Risk" family) — thin wrappers over `RiskService`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::container::Container;
use crate::domain::errors::SentinelError;
use crate::domain::ids::Isin;

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

pub async fn portfolio_metrics(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let metrics = container.risk_service.portfolio_metrics(&snapshot).await?;
    Ok(Json(json!({"metrics": metrics})))
}

/// `/api/risk/portfolio/{metric}` — a single named field off the same
/// portfolio metrics computation, for callers that only want one number.
pub async fn portfolio_metric(State(container): State<Arc<Container>>, Path(metric): Path<String>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let Some(metrics) = container.risk_service.portfolio_metrics(&snapshot).await? else {
        return Ok(Json(json!({"value": null})));
    };
    let value = pick_metric(&metrics, &metric)?;
    Ok(Json(json!({"metric": metric, "value": value})))
}

pub async fn security_metrics(State(container): State<Arc<Container>>, Path(isin): Path<String>) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&isin)?;
    let metrics = container.risk_service.security_metrics(&isin).await?;
    Ok(Json(json!({"metrics": metrics})))
}

pub async fn security_metric(
    State(container): State<Arc<Container>>,
    Path((isin, metric)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&isin)?;
    let Some(metrics) = container.risk_service.security_metrics(&isin).await? else {
        return Ok(Json(json!({"value": null})));
    };
    let value = pick_metric(&metrics, &metric)?;
    Ok(Json(json!({"metric": metric, "value": value})))
}

fn pick_metric(metrics: &crate::domain::risk::RiskMetrics, name: &str) -> crate::domain::errors::SentinelResult<f64> {
    match name {
        "var" | "value-at-risk" => Ok(metrics.value_at_risk),
        "cvar" | "conditional-value-at-risk" => Ok(metrics.conditional_value_at_risk),
        "sharpe" => Ok(metrics.sharpe_ratio),
        "sortino" => Ok(metrics.sortino_ratio),
        "volatility" => Ok(metrics.volatility),
        "max-drawdown" => Ok(metrics.max_drawdown),
        other => Err(SentinelError::validation(format!("unknown risk metric '{other}'"))),
    }
}

pub async fn kelly_sizes(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let securities = container.securities.all_active().await?;
    let mut sizes = Vec::new();
    for security in securities {
        if let Some(size) = container.risk_service.kelly_size(&security.isin).await? {
            sizes.push(size);
        }
    }
    Ok(Json(json!({"kelly_sizes": sizes})))
}

pub async fn kelly_size(State(container): State<Arc<Container>>, Path(isin): Path<String>) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&isin)?;
    let size = container.risk_service.kelly_size(&isin).await?;
    Ok(Json(json!({"kelly_size": size})))
}
