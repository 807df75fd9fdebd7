//! C6: portfolio synchronization (spec §4.6). Pulls broker-reported
//! positions, cash balances, and cash movements and fully replaces the
//! portfolio store's mutable state, then publishes the events that the
//! universe invalidator (C10) reacts to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::errors::SentinelResult;
use crate::domain::event::{Event, EventKind, EventPayload};
use crate::domain::hash;
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::ports::BrokerClient;
use crate::domain::repositories::{CashFlowRepository, CashRepository, GroupTargetRepository, PositionRepository};
use crate::infrastructure::event_bus::EventBus;

pub struct PortfolioService {
    broker: Arc<dyn BrokerClient>,
    positions: Arc<dyn PositionRepository>,
    cash: Arc<dyn CashRepository>,
    cash_flows: Arc<dyn CashFlowRepository>,
    group_targets: Arc<dyn GroupTargetRepository>,
    events: Arc<EventBus>,
}

impl PortfolioService {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        positions: Arc<dyn PositionRepository>,
        cash: Arc<dyn CashRepository>,
        cash_flows: Arc<dyn CashFlowRepository>,
        group_targets: Arc<dyn GroupTargetRepository>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            broker,
            positions,
            cash,
            cash_flows,
            group_targets,
            events,
        }
    }

    /// Replaces the full position and cash snapshot from the broker (spec
    /// §3: "fully recomputed on every portfolio sync", not reconciled), then
    /// recomputes `portfolio_hash` over the freshly-synced state so the
    /// invalidator (C10) sees the same fingerprint the planner will use.
    pub async fn sync_portfolio(&self) -> SentinelResult<String> {
        let positions = self.broker.positions().await?;
        let cash = self.broker.cash_balances().await?;

        self.positions.replace_all(&positions).await?;
        self.cash.replace_all(&cash).await?;

        info!(positions = positions.len(), cash_currencies = cash.len(), "portfolio synced");

        let snapshot = PortfolioSnapshot {
            positions: positions.into_iter().map(|p| (p.isin.clone(), p)).collect(),
            cash: cash.into_iter().map(|c| (c.currency.clone(), c)).collect(),
        };
        let targets = self.group_targets.all().await?;
        let portfolio_hash = hash::portfolio_hash(&snapshot, &targets);

        self.events.publish(Event::new(
            EventKind::PortfolioChanged,
            "portfolio_service",
            EventPayload::PortfolioChanged {
                portfolio_hash: portfolio_hash.clone(),
            },
        ));
        self.events.publish(Event::new(
            EventKind::CashUpdated,
            "portfolio_service",
            EventPayload::Empty,
        ));
        Ok(portfolio_hash)
    }

    /// Pulls new cash movements since `since` and appends any not already
    /// recorded, keyed by the broker's transaction id (spec §4.6).
    pub async fn sync_cash_flows(&self, since: DateTime<Utc>) -> SentinelResult<u64> {
        self.events.publish(Event::new(
            EventKind::CashFlowSyncStart,
            "portfolio_service",
            EventPayload::Empty,
        ));

        let flows = self.broker.cash_movements(since, Utc::now()).await?;
        let mut appended = 0u64;
        for flow in &flows {
            if self.cash_flows.append_if_new(flow).await? {
                appended += 1;
            }
        }

        self.events.publish(Event::new(
            EventKind::CashFlowSyncComplete,
            "portfolio_service",
            EventPayload::Empty,
        ));
        Ok(appended)
    }

    /// Flags negative cash balances across all currencies (spec §4.3
    /// `check-negative-balances` job).
    pub async fn negative_balances(&self) -> SentinelResult<Vec<String>> {
        let balances = self.cash.all().await?;
        Ok(balances
            .into_iter()
            .filter(|b| b.amount.is_sign_negative())
            .map(|b| b.currency)
            .collect())
    }
}
