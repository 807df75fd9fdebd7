//! `/health` and `/api/system/*` (spec §6 "System" family).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::application::scheduler::registry::{
    DAILY_PIPELINE, REBUILD_UNIVERSE, SYNC_CASH_FLOWS, SYNC_HISTORICAL, SYNC_PORTFOLIO, SYNC_PRICES,
    SYNC_RECOMMENDATIONS, SYNC_SECURITIES_DATA,
};
use crate::container::Container;
use crate::domain::market_hours::Mic;

use super::error::ApiResult;

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn version() -> Json<Value> {
    Json(json!({"version": env!("CARGO_PKG_VERSION")}))
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub metrics: crate::infrastructure::observability::metrics::MetricsSnapshot,
    pub broker_connected: bool,
}

pub async fn status(State(container): State<Arc<Container>>) -> Json<SystemStatus> {
    let (connected, _) = container.broker.connected().await;
    Json(SystemStatus { metrics: container.metrics.snapshot(), broker_connected: connected })
}

pub async fn jobs(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let recent = container.jobs.recent(50).await?;
    Ok(Json(json!({"jobs": recent})))
}

pub async fn database_stats(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let mut stats = Vec::new();
    for store in container.storage.all() {
        let s = store.stats().await?;
        stats.push(json!({
            "name": store.name,
            "size_mb": s.size_mb,
            "wal_mb": s.wal_mb,
            "page_count": s.page_count,
            "freelist": s.freelist,
        }));
    }
    Ok(Json(json!({"stores": stats})))
}

pub async fn disk(State(_container): State<Arc<Container>>) -> Json<Value> {
    Json(json!({"note": "disk-space status is evaluated in-process during maintenance jobs, not exposed per-request"}))
}

pub async fn markets(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let statuses = container.market_hours.statuses(&Mic::all()).await?;
    Ok(Json(json!({"markets": statuses})))
}

pub async fn tradernet(State(container): State<Arc<Container>>) -> Json<Value> {
    let (connected, since) = container.broker.connected().await;
    Json(json!({"connected": connected, "since": since}))
}

/// `POST /api/system/sync/{kind}` — triggers the matching named job
/// immediately rather than waiting for its interval/cron trigger.
pub async fn trigger_sync(State(container): State<Arc<Container>>, Path(kind): Path<String>) -> ApiResult<Json<Value>> {
    let name = match kind.as_str() {
        "prices" => SYNC_PRICES,
        "portfolio" => SYNC_PORTFOLIO,
        "historical" => SYNC_HISTORICAL,
        "recommendations" => SYNC_RECOMMENDATIONS,
        "securities-data" => SYNC_SECURITIES_DATA,
        "daily-pipeline" => DAILY_PIPELINE,
        "rebuild-universe" => REBUILD_UNIVERSE,
        other => {
            return Err(crate::domain::errors::SentinelError::validation(format!("unknown sync kind '{other}'")).into())
        }
    };
    container.scheduler.trigger_manual(name).await?;
    Ok(Json(json!({"triggered": name})))
}

/// `POST /api/system/jobs/{job_name}` — idempotent manual enqueue (spec
/// P10): the scheduler's in-flight check means a second call within the
/// same run is a no-op rather than a second queued row.
pub async fn trigger_job(State(container): State<Arc<Container>>, Path(name): Path<String>) -> ApiResult<Json<Value>> {
    container.scheduler.trigger_manual(&name).await?;
    Ok(Json(json!({"triggered": name})))
}
