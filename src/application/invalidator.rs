//! C10: universe monitor / planning-cache invalidator (spec §4.10).
//!
//! Subscribes to every event that can change which securities belong to
//! the active universe or how the portfolio looks, recomputes the two
//! fingerprints, and purges the planning cache iff either one moved. This
//! is the sole authorized path for clearing sequences, evaluations, and
//! best-plans — nothing else in the daemon calls `purge_cache` directly.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::errors::SentinelResult;
use crate::domain::event::{Event, EventKind, EventPayload};
use crate::domain::hash;
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::repositories::{CashRepository, GroupTargetRepository, PositionRepository, SecurityRepository};
use crate::infrastructure::event_bus::{EventBus, EventSubscription};
use crate::infrastructure::persistence::stores::StorageSubstrate;

use super::scheduler::registry::PLANNER_BATCH;
use super::scheduler::worker::JobScheduler;

const MODULE: &str = "universe_invalidator";

fn watched(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::PortfolioChanged
            | EventKind::AllocationTargetsChanged
            | EventKind::SecurityAdded
            | EventKind::ScoreUpdated
    )
}

struct Fingerprints {
    universe: String,
    portfolio: String,
}

pub struct UniverseInvalidator {
    storage: Arc<StorageSubstrate>,
    securities: Arc<dyn SecurityRepository>,
    group_targets: Arc<dyn GroupTargetRepository>,
    positions: Arc<dyn PositionRepository>,
    cash: Arc<dyn CashRepository>,
    scheduler: Arc<JobScheduler>,
    events: Arc<EventBus>,
    last: Mutex<Option<Fingerprints>>,
}

impl UniverseInvalidator {
    pub fn new(
        storage: Arc<StorageSubstrate>,
        securities: Arc<dyn SecurityRepository>,
        group_targets: Arc<dyn GroupTargetRepository>,
        positions: Arc<dyn PositionRepository>,
        cash: Arc<dyn CashRepository>,
        scheduler: Arc<JobScheduler>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            storage,
            securities,
            group_targets,
            positions,
            cash,
            scheduler,
            events,
            last: Mutex::new(None),
        }
    }

    /// Runs until the event bus is closed. Intended to be spawned as a
    /// background task by the container.
    pub async fn run(self: Arc<Self>) {
        let mut sub: EventSubscription = self.events.subscribe();
        loop {
            match sub.recv().await {
                Some(event) => {
                    if watched(event.kind) {
                        if let Err(e) = self.observe(&event).await {
                            warn!(error = %e, event = ?event.kind, "universe invalidator failed to process event");
                        }
                    }
                }
                None => {
                    info!("universe invalidator stopping: event bus closed");
                    return;
                }
            }
        }
    }

    async fn observe(&self, event: &Event) -> SentinelResult<()> {
        let active = self.securities.all_active().await?;
        let active_isins: Vec<_> = active.iter().map(|s| s.isin.clone()).collect();
        let targets = self.group_targets.all().await?;

        let universe = hash::universe_state_hash(&active_isins, &targets);

        let positions = self.positions.all().await?;
        let cash = self.cash.all().await?;
        let mut snapshot = PortfolioSnapshot::default();
        for p in positions {
            snapshot.positions.insert(p.isin.clone(), p);
        }
        for c in cash {
            snapshot.cash.insert(c.currency.clone(), c);
        }
        let portfolio = hash::portfolio_hash(&snapshot, &targets);

        let mut last = self.last.lock().await;
        let changed = match last.as_ref() {
            Some(prev) => prev.universe != universe || prev.portfolio != portfolio,
            None => true,
        };

        if !changed {
            return Ok(());
        }

        *last = Some(Fingerprints {
            universe: universe.clone(),
            portfolio: portfolio.clone(),
        });
        drop(last);

        info!(
            trigger = ?event.kind,
            universe_hash = %universe,
            portfolio_hash = %portfolio,
            "universe or portfolio fingerprint changed, purging planning cache"
        );

        self.storage.purge_cache().await?;
        self.events.publish(Event::new(
            EventKind::RecommendationsReady,
            MODULE,
            EventPayload::RecommendationsReady { plan_count: 0 },
        ));
        self.scheduler.trigger_manual(PLANNER_BATCH).await?;

        Ok(())
    }
}
