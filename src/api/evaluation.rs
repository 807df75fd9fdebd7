//! `/api/v1/evaluate/*`, `/api/v1/monte-carlo/*`, `/api/v1/simulate/*`
//! (spec §6 "Evaluation" family) — ad hoc evaluation of a hypothetical
//! sequence against live portfolio state, using the same
//! `SequenceEvaluator`/`component_fits` the planner batch job runs.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::application::planning::service::component_fits;
use crate::container::Container;
use crate::domain::evaluation::{AllocationFitWeights, EvaluationContext};
use crate::domain::opportunity::{ActionCandidate, ActionSequence};
use crate::domain::security::GroupKind;

use super::error::ApiResult;

async fn load_snapshot(container: &Container) -> crate::domain::errors::SentinelResult<crate::domain::portfolio::PortfolioSnapshot> {
    let mut snapshot = crate::domain::portfolio::PortfolioSnapshot::default();
    for p in container.positions.all().await? {
        snapshot.positions.insert(p.isin.clone(), p);
    }
    for c in container.cash.all().await? {
        snapshot.cash.insert(c.currency.clone(), c);
    }
    Ok(snapshot)
}

async fn security_map(container: &Container) -> crate::domain::errors::SentinelResult<HashMap<String, crate::domain::security::Security>> {
    Ok(container.securities.all().await?.into_iter().map(|s| (s.isin.to_string(), s)).collect())
}

#[derive(Deserialize)]
pub struct SequenceInput {
    pub steps: Vec<ActionCandidate>,
    #[serde(default)]
    pub context: Option<EvaluationContext>,
}

fn to_sequence(steps: Vec<ActionCandidate>) -> ActionSequence {
    let pattern_type = ActionSequence::classify_pattern(&steps);
    let depth = steps.len();
    ActionSequence { steps, depth, pattern_type }
}

/// Builds `(geographic, industry, quality, optimizer)` the same way the
/// planner batch job does, minus the live scorer: an ad hoc evaluation has
/// no pre-computed security scores, so quality/optimizer fall back to 0.
async fn fits_for(
    container: &Container,
    sequence: &ActionSequence,
    snapshot: &crate::domain::portfolio::PortfolioSnapshot,
) -> crate::domain::errors::SentinelResult<(f64, f64, f64, f64)> {
    let securities = security_map(container).await?;
    let targets = container.group_targets.all().await?;
    let country_targets = crate::domain::security::normalize_targets(&targets, GroupKind::Country);
    let industry_targets = crate::domain::security::normalize_targets(&targets, GroupKind::Industry);
    let scores = HashMap::new();
    Ok(component_fits(
        sequence,
        snapshot,
        &securities,
        AllocationFitWeights::defaults(),
        &country_targets,
        &industry_targets,
        &scores,
    ))
}

pub async fn evaluate_single(State(container): State<Arc<Container>>, Json(body): Json<SequenceInput>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let targets = container.group_targets.all().await?;
    let hash = crate::domain::hash::portfolio_hash(&snapshot, &targets);
    let sequence = to_sequence(body.steps);
    let fits = fits_for(&container, &sequence, &snapshot).await?;
    let context = body.context.unwrap_or_default();
    let result = crate::application::planning::evaluator::SequenceEvaluator::evaluate(&sequence, &snapshot, &hash, &context, fits);
    Ok(Json(json!({"result": result})))
}

#[derive(Deserialize)]
pub struct BatchInput {
    pub sequences: Vec<SequenceInput>,
}

pub async fn evaluate_batch(State(container): State<Arc<Container>>, Json(body): Json<BatchInput>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let targets = container.group_targets.all().await?;
    let hash = crate::domain::hash::portfolio_hash(&snapshot, &targets);
    let mut results = Vec::new();
    for input in body.sequences {
        let sequence = to_sequence(input.steps);
        let fits = fits_for(&container, &sequence, &snapshot).await?;
        let context = input.context.unwrap_or_default();
        results.push(crate::application::planning::evaluator::SequenceEvaluator::evaluate(
            &sequence, &snapshot, &hash, &context, fits,
        ));
    }
    Ok(Json(json!({"results": results})))
}

#[derive(Deserialize)]
pub struct CompareInput {
    pub a: SequenceInput,
    pub b: SequenceInput,
}

pub async fn compare(State(container): State<Arc<Container>>, Json(body): Json<CompareInput>) -> ApiResult<Json<Value>> {
    let snapshot = load_snapshot(&container).await?;
    let targets = container.group_targets.all().await?;
    let hash = crate::domain::hash::portfolio_hash(&snapshot, &targets);

    let sequence_a = to_sequence(body.a.steps);
    let fits_a = fits_for(&container, &sequence_a, &snapshot).await?;
    let context_a = body.a.context.unwrap_or_default();
    let result_a = crate::application::planning::evaluator::SequenceEvaluator::evaluate(&sequence_a, &snapshot, &hash, &context_a, fits_a);

    let sequence_b = to_sequence(body.b.steps);
    let fits_b = fits_for(&container, &sequence_b, &snapshot).await?;
    let context_b = body.b.context.unwrap_or_default();
    let result_b = crate::application::planning::evaluator::SequenceEvaluator::evaluate(&sequence_b, &snapshot, &hash, &context_b, fits_b);

    let winner = if result_a.end_score >= result_b.end_score { "a" } else { "b" };
    Ok(Json(json!({"a": result_a, "b": result_b, "winner": winner})))
}

/// Shared by `/monte-carlo`, `/monte-carlo/advanced`, and
/// `/evaluate/stochastic` — the evaluator only exposes the one stochastic
/// mode (spec §4.8 step 3); "advanced" widens the default path count
/// rather than switching algorithms.
async fn stochastic(container: &Container, mut body: SequenceInput, default_paths: usize) -> crate::domain::errors::SentinelResult<Value> {
    let snapshot = load_snapshot(container).await?;
    let targets = container.group_targets.all().await?;
    let hash = crate::domain::hash::portfolio_hash(&snapshot, &targets);
    let steps = std::mem::take(&mut body.steps);
    let sequence = to_sequence(steps);
    let fits = fits_for(container, &sequence, &snapshot).await?;
    let mut context = body.context.unwrap_or_default();
    if context.paths.is_none() {
        context.paths = Some(default_paths);
    }
    let summary = crate::application::planning::evaluator::SequenceEvaluator::evaluate_stochastic(&sequence, &snapshot, &hash, &context, fits);
    Ok(json!({"summary": summary}))
}

pub async fn evaluate_stochastic(State(container): State<Arc<Container>>, Json(body): Json<SequenceInput>) -> ApiResult<Json<Value>> {
    Ok(Json(stochastic(&container, body, 200).await?))
}

pub async fn monte_carlo(State(container): State<Arc<Container>>, Json(body): Json<SequenceInput>) -> ApiResult<Json<Value>> {
    Ok(Json(stochastic(&container, body, 200).await?))
}

pub async fn monte_carlo_advanced(State(container): State<Arc<Container>>, Json(body): Json<SequenceInput>) -> ApiResult<Json<Value>> {
    Ok(Json(stochastic(&container, body, 1000).await?))
}

pub async fn simulate_batch(state: State<Arc<Container>>, body: Json<BatchInput>) -> ApiResult<Json<Value>> {
    evaluate_batch(state, body).await
}

/// `EvaluationContext::custom_prices` is carried by the domain model but
/// not yet consumed by `SequenceEvaluator::evaluate` (it simulates off each
/// step's own `value_eur`, not a live price lookup) — passed through as-is
/// rather than silently dropped.
pub async fn simulate_custom_prices(State(container): State<Arc<Container>>, Json(body): Json<SequenceInput>) -> ApiResult<Json<Value>> {
    evaluate_single(State(container), Json(body)).await
}

pub async fn criteria() -> Json<Value> {
    Json(json!({"allocation_fit_weights": AllocationFitWeights::defaults()}))
}
