//! Cache store entities produced by the sequence evaluator (spec §3, §4.8).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::opportunity::ActionSequence;

/// Weighted components of `allocation_fit` (spec §4.8 step 2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AllocationFitWeights {
    pub geographic: f64,
    pub industry: f64,
    pub quality_score: f64,
    pub optimizer: f64,
}

impl AllocationFitWeights {
    pub fn defaults() -> Self {
        Self {
            geographic: 0.25,
            industry: 0.25,
            quality_score: 0.15,
            optimizer: 0.35,
        }
    }

    pub fn sum(&self) -> f64 {
        self.geographic + self.industry + self.quality_score + self.optimizer
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub geographic_fit: f64,
    pub industry_fit: f64,
    pub quality_fit: f64,
    pub optimizer_fit: f64,
    pub transaction_costs: Decimal,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    Pending,
    Evaluated,
    Winning,
    NotWinning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub sequence_hash: String,
    pub portfolio_hash: String,
    pub end_score: f64,
    pub breakdown: ScoreBreakdown,
    pub end_cash: HashMap<String, Decimal>,
    pub end_positions: HashMap<String, Decimal>,
    pub diversification_score: f64,
    pub total_value: Decimal,
    pub evaluated_at: DateTime<Utc>,
    pub state: SequenceState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolisticPlan {
    pub portfolio_hash: String,
    pub sequence: ActionSequence,
    pub sequence_hash: String,
    pub score: f64,
    pub updated_at: DateTime<Utc>,
    pub step_execution_status: Vec<PlanStepStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    Pending,
    Executed,
    Failed,
    Skipped,
}

/// Inputs that parameterize a single evaluation run (spec §9 "evaluation_context").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub transaction_cost_fixed: Decimal,
    pub transaction_cost_percent: f64,
    pub initial_portfolio_value: Option<Decimal>,
    pub custom_prices: Option<HashMap<String, Decimal>>,
    pub symbol_volatilities: Option<HashMap<String, f64>>,
    pub custom_drift: Option<HashMap<String, f64>>,
    pub conservative_weight: Option<f64>,
    pub paths: Option<usize>,
    pub iterations: Option<usize>,
    pub confidence_level: Option<f64>,
    pub penalty_factor: f64,
    pub allocation_weights: AllocationFitWeights,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            transaction_cost_fixed: Decimal::new(2, 0),
            transaction_cost_percent: 0.002,
            initial_portfolio_value: None,
            custom_prices: None,
            symbol_volatilities: None,
            custom_drift: None,
            conservative_weight: None,
            paths: None,
            iterations: None,
            confidence_level: None,
            penalty_factor: 1.0,
            allocation_weights: AllocationFitWeights::defaults(),
        }
    }
}

/// Percentile summary produced by the Monte-Carlo / stochastic evaluator (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StochasticSummary {
    pub final_score: f64,
    pub worst: f64,
    pub best: f64,
    pub p10: f64,
    pub p90: f64,
    pub avg: f64,
    pub paths: usize,
    pub score_distribution: Vec<f64>,
}
