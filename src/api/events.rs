//! `GET /api/events/stream` (spec §6 "Events" family, spec §4.2) — raw SSE
//! feed over every event the bus carries, unlike the planning stream which
//! filters to planning-only kinds.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures_util::stream::{self, Stream};

use crate::container::Container;

pub async fn stream(State(container): State<Arc<Container>>) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let sub = container.events.subscribe();
    let events = stream::unfold(sub, |mut sub| async move {
        let event = sub.recv().await?;
        let payload = serde_json::to_string(&*event).unwrap_or_default();
        Some((Ok(SseEvent::default().event(event_name(&event.kind)).data(payload)), sub))
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn event_name(kind: &crate::domain::event::EventKind) -> &'static str {
    use crate::domain::event::EventKind::*;
    match kind {
        CashFlowSyncStart => "cash_flow_sync_start",
        CashFlowSyncComplete => "cash_flow_sync_complete",
        DepositProcessed => "deposit_processed",
        DividendCreated => "dividend_created",
        DividendDetected => "dividend_detected",
        SecurityAdded => "security_added",
        SecuritySynced => "security_synced",
        ScoreUpdated => "score_updated",
        PortfolioChanged => "portfolio_changed",
        PriceUpdated => "price_updated",
        RecommendationsReady => "recommendations_ready",
        PlanGenerated => "plan_generated",
        TradeExecuted => "trade_executed",
        CashUpdated => "cash_updated",
        AllocationTargetsChanged => "allocation_targets_changed",
        SettingsChanged => "settings_changed",
        PlannerConfigChanged => "planner_config_changed",
        LogFileChanged => "log_file_changed",
        SystemStatusChanged => "system_status_changed",
        TradernetStatusChanged => "tradernet_status_changed",
        MarketsStatusChanged => "markets_status_changed",
        PlanningStatusUpdated => "planning_status_updated",
        ErrorOccurred => "error_occurred",
    }
}
