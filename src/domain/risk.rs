//! Read-only risk/analytics projections (spec §4 historical & risk
//! endpoints). These are descriptive statistics over historical returns,
//! not a live risk engine — no position limits are enforced from here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub value_at_risk: f64,
    pub conditional_value_at_risk: f64,
    pub sample_size: usize,
}

/// Fraction of capital the continuous Kelly criterion recommends allocating
/// to a single position, derived from its historical mean/variance of
/// returns (spec §4 `/kelly-sizes`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KellySize {
    pub isin: String,
    pub fraction: f64,
}
