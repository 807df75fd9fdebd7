//! Named job registry (spec §4.3). Each job is keyed by a stable name used
//! for coalescing, logging, and the job-history table.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::SentinelResult;
use crate::domain::event::EventKind;
use crate::domain::job::JobPriority;

#[derive(Debug, Clone)]
pub enum JobTrigger {
    Cron(&'static str),
    Interval(Duration),
    Event(EventKind),
    Manual,
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self) -> SentinelResult<()>;
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = SentinelResult<()>> + Send>>;

#[async_trait]
impl<F, Fut> JobHandler for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = SentinelResult<()>> + Send + 'static,
{
    async fn run(&self) -> SentinelResult<()> {
        (self)().await
    }
}

#[derive(Clone)]
pub struct JobDefinition {
    pub name: &'static str,
    pub trigger: JobTrigger,
    pub priority: JobPriority,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub handler: Arc<dyn JobHandler>,
}

/// The fixed set of job families the daemon runs (spec §4.3). Names are the
/// coalescing key: two instances of the same named job never run
/// concurrently.
pub const SYNC_PORTFOLIO: &str = "sync-portfolio";
pub const SYNC_PRICES: &str = "sync-prices";
pub const SYNC_CASH_FLOWS: &str = "sync-cash-flows";
pub const SYNC_HISTORICAL: &str = "sync-historical";
pub const SYNC_RECOMMENDATIONS: &str = "sync-recommendations";
pub const SYNC_SECURITIES_DATA: &str = "sync-securities-data";
pub const REBUILD_UNIVERSE: &str = "rebuild-universe";
pub const DAILY_PIPELINE: &str = "daily-pipeline";
pub const PLANNER_BATCH: &str = "planner-batch";
pub const EVENT_BASED_TRADING: &str = "event-based-trading";
pub const DIVIDEND_REINVESTMENT: &str = "dividend-reinvestment";
pub const CHECK_NEGATIVE_BALANCES: &str = "check-negative-balances";
pub const UPDATE_DISPLAY_TICKER: &str = "update-display-ticker";
pub const TAG_UPDATE: &str = "tag-update";
pub const DAILY_MAINTENANCE: &str = "daily-maintenance";
pub const WEEKLY_MAINTENANCE: &str = "weekly-maintenance";
pub const MONTHLY_MAINTENANCE: &str = "monthly-maintenance";

pub struct JobRegistry {
    pub definitions: Vec<JobDefinition>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self { definitions: Vec::new() }
    }

    pub fn register(&mut self, definition: JobDefinition) {
        self.definitions.push(definition);
    }

    pub fn find(&self, name: &str) -> Option<&JobDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn triggered_by(&self, kind: EventKind) -> Vec<&JobDefinition> {
        self.definitions
            .iter()
            .filter(|d| matches!(d.trigger, JobTrigger::Event(k) if k == kind))
            .collect()
    }

    pub fn on_interval(&self) -> Vec<&JobDefinition> {
        self.definitions
            .iter()
            .filter(|d| matches!(d.trigger, JobTrigger::Interval(_)))
            .collect()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
