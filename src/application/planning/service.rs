//! C8 planning batch orchestration (spec §4.8, §5): runs the generator once,
//! fans evaluation out across a bounded rayon pool (default 4), persists the
//! winning plan, and reports progress on the event bus.
//!
//! CPU-bound evaluation runs on a dedicated `rayon::ThreadPool` bridged back
//! into the async world through a oneshot channel, the same pattern the
//! volume-profile batch job uses for its own CPU-bound work.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::errors::{SentinelError, SentinelResult};
use crate::domain::event::{Event, EventKind, EventPayload};
use crate::domain::evaluation::{AllocationFitWeights, EvaluationContext, EvaluationResult, HolisticPlan};
use crate::domain::ids::Isin;
use crate::domain::opportunity::{ActionSequence, OpportunitiesByCategory};
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::repositories::{EvaluationRepository, PlanRepository, SequenceRepository};
use crate::domain::security::{GroupKind, GroupTarget, Security};
use crate::infrastructure::event_bus::EventBus;

use super::evaluator::SequenceEvaluator;
use super::generator::{DetailedProgressUpdate, GenerationProgressSink, SequenceGenerator};

use tracing::warn;

const MODULE: &str = "planning";

pub struct PlanningConfig {
    /// Bounded fan-out for parallel evaluation (spec §5: "default 4").
    pub evaluation_fan_out: usize,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self { evaluation_fan_out: 4 }
    }
}

pub struct PlanningService {
    generator: SequenceGenerator,
    sequences: Arc<dyn SequenceRepository>,
    evaluations: Arc<dyn EvaluationRepository>,
    plans: Arc<dyn PlanRepository>,
    events: Arc<EventBus>,
    config: PlanningConfig,
}

impl PlanningService {
    pub fn new(
        generator: SequenceGenerator,
        sequences: Arc<dyn SequenceRepository>,
        evaluations: Arc<dyn EvaluationRepository>,
        plans: Arc<dyn PlanRepository>,
        events: Arc<EventBus>,
        config: PlanningConfig,
    ) -> Self {
        Self {
            generator,
            sequences,
            evaluations,
            plans,
            events,
            config,
        }
    }

    /// Runs one full planning batch: generate, evaluate (bounded fan-out),
    /// persist, and announce the winner. A failure scoring one sequence is
    /// folded into that sequence's breakdown and does not abort the batch
    /// (spec §4.8 "Failure semantics").
    pub async fn run_batch(
        &self,
        opportunities: &OpportunitiesByCategory,
        snapshot: &PortfolioSnapshot,
        portfolio_hash: &str,
        securities: &HashMap<String, Security>,
        targets: &[GroupTarget],
        scores: &HashMap<String, f64>,
        context: EvaluationContext,
    ) -> SentinelResult<Option<HolisticPlan>> {
        let sink = EventBusProgressSink { events: self.events.as_ref() };
        let sequences = self.generator.generate_with_progress(opportunities, snapshot, Some(&sink));
        let total = sequences.len() as u64;
        self.publish_progress("sequence_generation", total, total, None);

        for sequence in &sequences {
            self.sequences.save(portfolio_hash, sequence).await?;
        }

        let by_hash: HashMap<String, ActionSequence> = sequences
            .iter()
            .map(|s| (sequence_hash_of(s), s.clone()))
            .collect();

        let country_targets = normalize_weights(targets, GroupKind::Country);
        let industry_targets = normalize_weights(targets, GroupKind::Industry);

        let results = self
            .evaluate_fan_out(sequences, snapshot, portfolio_hash, securities, &context, &country_targets, &industry_targets, scores)
            .await?;

        let mut errors = 0u64;
        for (idx, result) in results.iter().enumerate() {
            self.evaluations.save(result).await?;
            if result.breakdown.error.is_some() {
                errors += 1;
            }
            self.publish_progress("evaluation", idx as u64 + 1, total, None);
        }
        if errors > 0 {
            warn!(errors, total, "planning batch completed with evaluation errors");
        }

        let winner = results
            .into_iter()
            .filter(|r| r.breakdown.error.is_none())
            .max_by(|a, b| {
                a.end_score
                    .partial_cmp(&b.end_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.breakdown.transaction_costs.cmp(&a.breakdown.transaction_costs))
                    .then_with(|| a.sequence_hash.cmp(&b.sequence_hash))
            });

        self.events.publish(Event::new(
            EventKind::RecommendationsReady,
            MODULE,
            EventPayload::RecommendationsReady { plan_count: total as usize },
        ));

        let Some(winner) = winner else {
            return Ok(None);
        };
        let Some(sequence) = by_hash.get(&winner.sequence_hash).cloned() else {
            return Ok(None);
        };

        let plan = HolisticPlan {
            portfolio_hash: portfolio_hash.to_string(),
            sequence,
            sequence_hash: winner.sequence_hash.clone(),
            score: winner.end_score,
            updated_at: chrono::Utc::now(),
            step_execution_status: Vec::new(),
        };
        self.plans.save(&plan).await?;
        self.events
            .publish(Event::new(EventKind::PlanGenerated, MODULE, EventPayload::Empty));

        Ok(Some(plan))
    }

    async fn evaluate_fan_out(
        &self,
        sequences: Vec<ActionSequence>,
        snapshot: &PortfolioSnapshot,
        portfolio_hash: &str,
        securities: &HashMap<String, Security>,
        context: &EvaluationContext,
        country_targets: &HashMap<String, f64>,
        industry_targets: &HashMap<String, f64>,
        scores: &HashMap<String, f64>,
    ) -> SentinelResult<Vec<EvaluationResult>> {
        let fan_out = self.config.evaluation_fan_out.max(1);
        let snapshot = snapshot.clone();
        let portfolio_hash = portfolio_hash.to_string();
        let securities = securities.clone();
        let context = context.clone();
        let country_targets = country_targets.clone();
        let industry_targets = industry_targets.clone();
        let scores = scores.clone();

        let (tx, rx) = tokio::sync::oneshot::channel();
        std::thread::Builder::new()
            .name("planning-fanout".into())
            .spawn(move || {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(fan_out)
                    .build()
                    .expect("bounded rayon pool");
                let results = pool.install(|| {
                    use rayon::prelude::*;
                    sequences
                        .par_iter()
                        .map(|sequence| {
                            evaluate_one(
                                sequence,
                                &snapshot,
                                &portfolio_hash,
                                &securities,
                                &context,
                                &country_targets,
                                &industry_targets,
                                &scores,
                            )
                        })
                        .collect::<Vec<_>>()
                });
                let _ = tx.send(results);
            })
            .map_err(|e| SentinelError::internal(format!("spawn planning worker: {e}")))?;

        rx.await
            .map_err(|_| SentinelError::internal("planning fan-out worker panicked"))
    }

    fn publish_progress(&self, phase: &str, current: u64, total: u64, details: Option<serde_json::Value>) {
        self.events.publish(Event::new(
            EventKind::PlanningStatusUpdated,
            MODULE,
            EventPayload::PlanningStatusUpdated {
                phase: phase.to_string(),
                current,
                total,
                details,
            },
        ));
    }
}

/// Publishes one `PlanningStatusUpdated` event per depth the generator
/// walks, carrying the depth's stats as `details` (spec §4.8
/// `DetailedProgressUpdate`, `subphase=depth_k`).
struct EventBusProgressSink<'a> {
    events: &'a EventBus,
}

impl GenerationProgressSink for EventBusProgressSink<'_> {
    fn on_depth_progress(&self, update: DetailedProgressUpdate) {
        self.events.publish(Event::new(
            EventKind::PlanningStatusUpdated,
            MODULE,
            EventPayload::PlanningStatusUpdated {
                phase: format!("depth_{}", update.current_depth),
                current: update.sequences_generated,
                total: update.candidates_count as u64,
                details: Some(serde_json::json!({
                    "candidates_count": update.candidates_count,
                    "current_depth": update.current_depth,
                    "combinations_at_depth": update.combinations_at_depth,
                    "sequences_generated": update.sequences_generated,
                    "infeasible_pruned": update.infeasible_pruned,
                })),
            },
        ));
    }
}

fn sequence_hash_of(sequence: &ActionSequence) -> String {
    let actions: Vec<crate::domain::hash::CanonicalAction> = sequence
        .steps
        .iter()
        .map(|s| crate::domain::hash::CanonicalAction {
            isin: s.isin.clone(),
            side: s.side,
            quantity: s.quantity,
        })
        .collect();
    crate::domain::hash::sequence_hash(&actions)
}

fn evaluate_one(
    sequence: &ActionSequence,
    snapshot: &PortfolioSnapshot,
    portfolio_hash: &str,
    securities: &HashMap<String, Security>,
    context: &EvaluationContext,
    country_targets: &HashMap<String, f64>,
    industry_targets: &HashMap<String, f64>,
    scores: &HashMap<String, f64>,
) -> EvaluationResult {
    let fits = component_fits(sequence, snapshot, securities, context.allocation_weights, country_targets, industry_targets, scores);
    SequenceEvaluator::evaluate(sequence, snapshot, portfolio_hash, context, fits)
}

/// Simulates the sequence's end-state and scores how well it matches the
/// configured country/industry targets plus the held universe's average
/// quality/optimizer scores (spec §4.8 step 2 "allocation_fit").
pub(crate) fn component_fits(
    sequence: &ActionSequence,
    snapshot: &PortfolioSnapshot,
    securities: &HashMap<String, Security>,
    _weights: AllocationFitWeights,
    country_targets: &HashMap<String, f64>,
    industry_targets: &HashMap<String, f64>,
    scores: &HashMap<String, f64>,
) -> (f64, f64, f64, f64) {
    let mut end_quantities: HashMap<String, Decimal> = snapshot
        .current_positions()
        .map(|p| (p.isin.to_string(), p.quantity))
        .collect();
    for step in &sequence.steps {
        let held = end_quantities.entry(step.isin.to_string()).or_insert(Decimal::ZERO);
        match step.side {
            crate::domain::ledger::Side::Sell => *held -= step.quantity,
            crate::domain::ledger::Side::Buy => *held += step.quantity,
        }
    }

    let mut total_value = Decimal::ZERO;
    let mut by_country: HashMap<String, Decimal> = HashMap::new();
    let mut by_industry: HashMap<String, Decimal> = HashMap::new();
    let mut quality_acc = 0.0;
    let mut optimizer_acc = 0.0;

    for (isin, qty) in &end_quantities {
        if *qty <= Decimal::ZERO {
            continue;
        }
        let Ok(isin) = Isin::parse(isin) else { continue };
        let Some(security) = securities.get(isin.as_str()) else {
            continue;
        };
        let price = snapshot
            .positions
            .get(&isin)
            .map(|p| p.market_price)
            .unwrap_or(Decimal::ZERO);
        let value = price * qty;
        total_value += value;
        *by_country.entry(security.country.clone()).or_default() += value;
        *by_industry.entry(security.industry.clone()).or_default() += value;

        let value_f64 = value.to_f64().unwrap_or(0.0);
        let score = scores.get(isin.as_str()).copied().unwrap_or(0.0);
        quality_acc += value_f64 * score;
        optimizer_acc += value_f64 * score;
    }

    if total_value <= Decimal::ZERO {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let total_f64 = total_value.to_f64().unwrap_or(1.0).max(1.0);

    let geographic = weight_match(&by_country, country_targets, total_value);
    let industry = weight_match(&by_industry, industry_targets, total_value);
    let quality = (quality_acc / total_f64).clamp(0.0, 1.0);
    let optimizer = (optimizer_acc / total_f64).clamp(0.0, 1.0);

    (geographic, industry, quality, optimizer)
}

/// `1 - total_variation_distance` between the end-state's value-weighted
/// group shares and the configured target weights.
fn weight_match(actual_by_group: &HashMap<String, Decimal>, targets: &HashMap<String, f64>, total: Decimal) -> f64 {
    if targets.is_empty() || total <= Decimal::ZERO {
        return 0.5;
    }
    let mut groups: std::collections::HashSet<&String> = actual_by_group.keys().collect();
    groups.extend(targets.keys());

    let deviation: f64 = groups
        .into_iter()
        .map(|g| {
            let actual = actual_by_group
                .get(g)
                .map(|v| (*v / total).to_f64().unwrap_or(0.0))
                .unwrap_or(0.0);
            let target = targets.get(g).copied().unwrap_or(0.0);
            (actual - target).abs()
        })
        .sum();
    (1.0 - deviation / 2.0).clamp(0.0, 1.0)
}

fn normalize_weights(targets: &[GroupTarget], kind: GroupKind) -> HashMap<String, f64> {
    crate::domain::security::normalize_targets(targets, kind)
}
