//! The `Scorer` strategy: scoring inputs are explicit, the formula is
//! pluggable (spec §4.6, §1 "concrete scoring formulas out of scope").

use serde::{Deserialize, Serialize};

use rust_decimal::prelude::ToPrimitive;

use crate::domain::history::PriceBar;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringInputs {
    pub daily_prices: Vec<PriceBar>,
    pub monthly_prices: Vec<PriceBar>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub five_year_avg_div_yield: Option<f64>,
    pub profit_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub analyst_recommendation: Option<f64>,
    pub upside_pct: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub market_avg_pe: Option<f64>,
    pub target_annual_return: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total: f64,
    pub quality: f64,
    pub opportunity: f64,
    pub fundamental: f64,
    pub technical: f64,
    pub cagr: f64,
    pub allocation_fit: f64,
}

/// Pluggable scoring strategy. The formula is deliberately out of scope of
/// this specification; `HeuristicScorer` below is a documented reference
/// implementation, not a tuned model.
pub trait Scorer: Send + Sync {
    fn score(&self, inputs: &ScoringInputs) -> ScoreBreakdown;
}

/// A simple, documented weighted-sum reference scorer so the pipeline is
/// exercisable end-to-end without a real quant model plugged in.
pub struct HeuristicScorer;

impl Scorer for HeuristicScorer {
    fn score(&self, inputs: &ScoringInputs) -> ScoreBreakdown {
        let fundamental = {
            let mut parts = Vec::new();
            if let (Some(pe), Some(avg_pe)) = (inputs.pe_ratio, inputs.market_avg_pe) {
                if avg_pe > 0.0 {
                    parts.push((1.0 - (pe / avg_pe - 1.0)).clamp(0.0, 1.0));
                }
            }
            if let Some(margin) = inputs.profit_margin {
                parts.push(margin.clamp(0.0, 1.0));
            }
            if let Some(dte) = inputs.debt_to_equity {
                parts.push((1.0 / (1.0 + dte.max(0.0))).clamp(0.0, 1.0));
            }
            avg_or_zero(&parts)
        };

        let technical = {
            let closes: Vec<f64> = inputs
                .daily_prices
                .iter()
                .map(|b| b.close.to_f64().unwrap_or(0.0))
                .collect();
            momentum_score(&closes)
        };

        let quality = {
            let mut parts = Vec::new();
            if let Some(sortino) = inputs.sortino_ratio {
                parts.push((sortino / 3.0).clamp(0.0, 1.0));
            }
            if let Some(dd) = inputs.max_drawdown {
                parts.push((1.0 - dd.abs()).clamp(0.0, 1.0));
            }
            avg_or_zero(&parts)
        };

        let opportunity = inputs.upside_pct.map(|u| u.clamp(-1.0, 1.0)).unwrap_or(0.0) * 0.5 + 0.5;

        let cagr = inputs.target_annual_return.unwrap_or(0.0).clamp(0.0, 1.0);

        let total = 0.3 * quality + 0.25 * opportunity + 0.25 * fundamental + 0.2 * technical;

        ScoreBreakdown {
            total,
            quality,
            opportunity,
            fundamental,
            technical,
            cagr,
            allocation_fit: 0.0,
        }
    }
}

fn avg_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn momentum_score(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return 0.5;
    }
    let first = closes[0];
    let last = closes[closes.len() - 1];
    if first <= 0.0 {
        return 0.5;
    }
    let change = (last - first) / first;
    (0.5 + change).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_score_is_neutral_for_flat_series() {
        assert_eq!(momentum_score(&[100.0, 100.0]), 0.5);
    }

    #[test]
    fn momentum_score_rewards_uptrend() {
        assert!(momentum_score(&[100.0, 110.0]) > 0.5);
    }

    #[test]
    fn heuristic_scorer_produces_bounded_total() {
        let scorer = HeuristicScorer;
        let breakdown = scorer.score(&ScoringInputs::default());
        assert!(breakdown.total >= 0.0 && breakdown.total <= 1.0);
    }
}
