//! C8 sequence evaluator (spec §4.8 steps 2-3): applies a sequence to a
//! simulated portfolio, scores the resulting allocation fit, and
//! optionally runs a Monte Carlo sweep over price volatility to produce a
//! `StochasticSummary`.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::evaluation::{EvaluationContext, EvaluationResult, ScoreBreakdown, SequenceState};
use crate::domain::hash::{sequence_hash, CanonicalAction};
use crate::domain::ledger::Side;
use crate::domain::opportunity::ActionSequence;
use crate::domain::portfolio::PortfolioSnapshot;

pub struct SequenceEvaluator;

impl SequenceEvaluator {
    /// Deterministic single-pass evaluation (spec §4.8 step 2: "allocation
    /// fit" weighted sum, minus simulated transaction costs).
    pub fn evaluate(
        sequence: &ActionSequence,
        snapshot: &PortfolioSnapshot,
        portfolio_hash: &str,
        context: &EvaluationContext,
        component_fits: (f64, f64, f64, f64), // geographic, industry, quality, optimizer
    ) -> EvaluationResult {
        let (mut end_cash, mut end_positions, transaction_costs) = simulate(sequence, snapshot, context);

        let weights = context.allocation_weights;
        let (geographic, industry, quality, optimizer) = component_fits;
        let raw_score = weights.geographic * geographic
            + weights.industry * industry
            + weights.quality_score * quality
            + weights.optimizer * optimizer;
        let cost_fraction = transaction_costs
            .to_f64()
            .unwrap_or(0.0)
            / context
                .initial_portfolio_value
                .and_then(|v| v.to_f64())
                .filter(|v| *v > 0.0)
                .unwrap_or(1.0);
        let end_score = (raw_score - cost_fraction * context.penalty_factor).max(0.0);

        let total_value: Decimal = end_cash.values().copied().sum::<Decimal>()
            + end_positions
                .iter()
                .map(|(isin, qty)| {
                    snapshot
                        .positions
                        .get(&crate::domain::ids::Isin::parse(isin).unwrap_or_else(|_| {
                            crate::domain::ids::Isin::parse("XX0000000000").unwrap()
                        }))
                        .map(|p| p.market_price * *qty)
                        .unwrap_or_default()
                })
                .sum::<Decimal>();

        let diversification_score = diversification(&end_positions);

        end_cash.retain(|_, v| *v != Decimal::ZERO);
        end_positions.retain(|_, v| *v != Decimal::ZERO);

        let actions: Vec<CanonicalAction> = sequence
            .steps
            .iter()
            .map(|s| CanonicalAction {
                isin: s.isin.clone(),
                side: s.side,
                quantity: s.quantity,
            })
            .collect();

        EvaluationResult {
            sequence_hash: sequence_hash(&actions),
            portfolio_hash: portfolio_hash.to_string(),
            end_score,
            breakdown: ScoreBreakdown {
                geographic_fit: geographic,
                industry_fit: industry,
                quality_fit: quality,
                optimizer_fit: optimizer,
                transaction_costs,
                error: None,
            },
            end_cash,
            end_positions,
            diversification_score,
            total_value,
            evaluated_at: Utc::now(),
            state: SequenceState::Evaluated,
        }
    }

    /// Perturbs each step's execution price by its symbol volatility across
    /// `paths` simulated runs and summarizes the resulting score
    /// distribution (spec §4.8 step 3, the Monte Carlo / stochastic mode).
    pub fn evaluate_stochastic(
        sequence: &ActionSequence,
        snapshot: &PortfolioSnapshot,
        portfolio_hash: &str,
        context: &EvaluationContext,
        component_fits: (f64, f64, f64, f64),
    ) -> crate::domain::evaluation::StochasticSummary {
        let paths = context.paths.unwrap_or(200).max(1);
        let mut rng = rand::rng();
        let mut scores = Vec::with_capacity(paths);

        for _ in 0..paths {
            let perturbed = perturb(sequence, context, &mut rng);
            let result = Self::evaluate(&perturbed, snapshot, portfolio_hash, context, component_fits);
            scores.push(result.end_score);
        }

        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let percentile = |p: f64| -> f64 {
            if scores.is_empty() {
                return 0.0;
            }
            let idx = ((scores.len() as f64 - 1.0) * p).round() as usize;
            scores[idx.min(scores.len() - 1)]
        };

        crate::domain::evaluation::StochasticSummary {
            final_score: percentile(0.5),
            worst: scores.first().copied().unwrap_or(0.0),
            best: scores.last().copied().unwrap_or(0.0),
            p10: percentile(0.1),
            p90: percentile(0.9),
            avg: scores.iter().sum::<f64>() / scores.len().max(1) as f64,
            paths,
            score_distribution: scores,
        }
    }
}

fn perturb(sequence: &ActionSequence, context: &EvaluationContext, rng: &mut impl Rng) -> ActionSequence {
    let Some(vol_map) = &context.symbol_volatilities else {
        return sequence.clone();
    };
    let mut steps = sequence.steps.clone();
    for step in &mut steps {
        let Some(vol) = vol_map.get(&step.symbol) else {
            continue;
        };
        if *vol <= 0.0 {
            continue;
        }
        let shock = standard_normal_sample(rng) * vol;
        let factor = Decimal::try_from((1.0 + shock).max(0.0)).unwrap_or(Decimal::ONE);
        step.value_eur *= factor;
    }
    ActionSequence {
        steps,
        depth: sequence.depth,
        pattern_type: sequence.pattern_type,
    }
}

/// Applies the sequence to a cloned cash/position map, returning
/// `(end_cash, end_positions, transaction_costs)`.
fn simulate(
    sequence: &ActionSequence,
    snapshot: &PortfolioSnapshot,
    context: &EvaluationContext,
) -> (HashMap<String, Decimal>, HashMap<String, Decimal>, Decimal) {
    let mut cash: HashMap<String, Decimal> = snapshot
        .cash
        .iter()
        .map(|(k, v)| (k.clone(), v.amount))
        .collect();
    let mut positions: HashMap<String, Decimal> = snapshot
        .positions
        .iter()
        .map(|(k, v)| (k.to_string(), v.quantity))
        .collect();
    let mut total_costs = Decimal::ZERO;

    for step in &sequence.steps {
        let percent_cost = step.value_eur * Decimal::try_from(context.transaction_cost_percent).unwrap_or_default();
        let cost = context.transaction_cost_fixed + percent_cost;
        total_costs += cost;

        let eur = cash.entry("EUR".to_string()).or_insert(Decimal::ZERO);
        let held = positions.entry(step.isin.to_string()).or_insert(Decimal::ZERO);
        match step.side {
            Side::Sell => {
                *held -= step.quantity;
                *eur += step.value_eur - cost;
            }
            Side::Buy => {
                *held += step.quantity;
                *eur -= step.value_eur + cost;
            }
        }
    }

    (cash, positions, total_costs)
}

/// Box-Muller transform: draws one standard-normal sample from two uniform
/// draws, avoiding a dependency on a separate distributions crate just for
/// price-shock sampling.
fn standard_normal_sample(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.random_range(1e-12..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn diversification(positions: &HashMap<String, Decimal>) -> f64 {
    let total: Decimal = positions.values().copied().sum();
    if total <= Decimal::ZERO {
        return 0.0;
    }
    let herfindahl: f64 = positions
        .values()
        .map(|v| {
            let share = (*v / total).to_f64().unwrap_or(0.0);
            share * share
        })
        .sum();
    (1.0 - herfindahl).clamp(0.0, 1.0)
}
