//! Event bus payloads (spec §4.2). `EventKind` is a closed enumeration;
//! `Event` carries a typed payload rather than a `HashMap<String, Value>` so
//! subscribers pattern-match instead of probing a loosely-typed map. The
//! HTTP/SSE facade is the only place these get serialized to JSON.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ledger::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    CashFlowSyncStart,
    CashFlowSyncComplete,
    DepositProcessed,
    DividendCreated,
    DividendDetected,
    SecurityAdded,
    SecuritySynced,
    ScoreUpdated,
    PortfolioChanged,
    PriceUpdated,
    RecommendationsReady,
    PlanGenerated,
    TradeExecuted,
    CashUpdated,
    AllocationTargetsChanged,
    SettingsChanged,
    PlannerConfigChanged,
    LogFileChanged,
    SystemStatusChanged,
    TradernetStatusChanged,
    MarketsStatusChanged,
    PlanningStatusUpdated,
    ErrorOccurred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    PortfolioChanged { portfolio_hash: String },
    PriceUpdated { isin: String, price: Decimal },
    TradeExecuted { trade: Box<Trade> },
    RecommendationsReady { plan_count: usize },
    ErrorOccurred { kind: String, message: String },
    PlanningStatusUpdated {
        phase: String,
        current: u64,
        total: u64,
        /// Depth-by-depth generation stats when `phase` is
        /// `sequence_generation` (spec §4.8 `DetailedProgressUpdate`).
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub module: String,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(kind: EventKind, module: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            kind,
            module: module.into(),
            timestamp: Utc::now(),
            payload,
        }
    }
}
