//! Repository trait abstractions (spec §4.1), one per store-owned entity,
//! following the teacher's `TradeRepository`/`PortfolioRepository` pattern
//! but widened to the seven-store model of this system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::SentinelResult;
use crate::domain::evaluation::{EvaluationResult, HolisticPlan};
use crate::domain::history::{FxRate, PriceBar};
use crate::domain::ids::Isin;
use crate::domain::job::Job;
use crate::domain::ledger::{CashFlow, Trade};
use crate::domain::opportunity::ActionSequence;
use crate::domain::portfolio::{CashBalance, Position};
use crate::domain::security::{GroupTarget, Security};

#[async_trait]
pub trait SecurityRepository: Send + Sync {
    async fn upsert(&self, security: &Security) -> SentinelResult<()>;
    async fn find(&self, isin: &Isin) -> SentinelResult<Option<Security>>;
    async fn all_active(&self) -> SentinelResult<Vec<Security>>;
    async fn all(&self) -> SentinelResult<Vec<Security>>;
    async fn set_active(&self, isin: &Isin, active: bool) -> SentinelResult<()>;
}

#[async_trait]
pub trait GroupTargetRepository: Send + Sync {
    async fn upsert(&self, target: &GroupTarget) -> SentinelResult<()>;
    async fn delete(&self, kind: &str, name: &str) -> SentinelResult<()>;
    async fn all(&self) -> SentinelResult<Vec<GroupTarget>>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Replaces the full position set atomically (spec §3: "fully recomputed
    /// on every portfolio sync").
    async fn replace_all(&self, positions: &[Position]) -> SentinelResult<()>;
    async fn all(&self) -> SentinelResult<Vec<Position>>;
}

#[async_trait]
pub trait CashRepository: Send + Sync {
    async fn replace_all(&self, balances: &[CashBalance]) -> SentinelResult<()>;
    async fn all(&self) -> SentinelResult<Vec<CashBalance>>;
    async fn upsert(&self, balance: &CashBalance) -> SentinelResult<()>;
}

#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn append(&self, trade: &Trade) -> SentinelResult<Trade>;
    async fn recent(&self, limit: usize) -> SentinelResult<Vec<Trade>>;
    async fn all(&self) -> SentinelResult<Vec<Trade>>;
    async fn find_by_order_id(&self, order_id: &str) -> SentinelResult<Option<Trade>>;
}

#[async_trait]
pub trait CashFlowRepository: Send + Sync {
    async fn append_if_new(&self, flow: &CashFlow) -> SentinelResult<bool>;
    async fn all(&self) -> SentinelResult<Vec<CashFlow>>;
}

#[async_trait]
pub trait PriceBarRepository: Send + Sync {
    /// Upsert with last-writer-wins on `(isin, date)` (spec §9 open question).
    async fn upsert(&self, bar: &PriceBar) -> SentinelResult<()>;
    async fn range(
        &self,
        isin: &Isin,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> SentinelResult<Vec<PriceBar>>;
    async fn latest(&self, isin: &Isin) -> SentinelResult<Option<PriceBar>>;
}

#[async_trait]
pub trait FxRateRepository: Send + Sync {
    async fn upsert(&self, rate: &FxRate) -> SentinelResult<()>;
    async fn latest(&self, from: &str, to: &str) -> SentinelResult<Option<FxRate>>;
}

#[async_trait]
pub trait SequenceRepository: Send + Sync {
    async fn save(&self, portfolio_hash: &str, sequence: &ActionSequence) -> SentinelResult<String>;
    async fn purge_all(&self) -> SentinelResult<u64>;
}

#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    async fn save(&self, result: &EvaluationResult) -> SentinelResult<()>;
    async fn find(&self, sequence_hash: &str, portfolio_hash: &str) -> SentinelResult<Option<EvaluationResult>>;
    async fn purge_all(&self) -> SentinelResult<u64>;
}

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn save(&self, plan: &HolisticPlan) -> SentinelResult<()>;
    async fn best_for(&self, portfolio_hash: &str) -> SentinelResult<Option<HolisticPlan>>;
    async fn purge_all(&self) -> SentinelResult<u64>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert_queued(&self, name: &str, scheduled_at: DateTime<Utc>) -> SentinelResult<Job>;
    async fn has_in_flight(&self, name: &str) -> SentinelResult<bool>;
    async fn mark_running(&self, id: i64) -> SentinelResult<()>;
    async fn mark_finished(&self, id: i64, ok: bool, error: Option<String>) -> SentinelResult<()>;
    async fn increment_retry(&self, id: i64) -> SentinelResult<u32>;
    async fn recent(&self, limit: usize) -> SentinelResult<Vec<Job>>;
}

#[async_trait]
pub trait DismissedFilterRepository: Send + Sync {
    async fn dismiss(&self, isin: &Isin, calculator: &str, reason: &str) -> SentinelResult<()>;
    async fn undismiss(&self, isin: &Isin, calculator: &str, reason: &str) -> SentinelResult<()>;
    async fn is_dismissed(&self, isin: &Isin, calculator: &str) -> SentinelResult<bool>;
    async fn clear_for_security(&self, isin: &Isin) -> SentinelResult<u64>;
    async fn all(&self) -> SentinelResult<Vec<(Isin, String, String)>>;
}
