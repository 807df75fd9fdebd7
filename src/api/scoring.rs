//! `/api/scoring/*` (spec §6 "Scoring" family). The scoring formula itself
//! is out of scope (spec §1) and pluggable behind `domain::scorer::Scorer`;
//! these handlers expose the bundled `HeuristicScorer` reference
//! implementation the same way the planner batch job builds its inputs.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::container::Container;
use crate::domain::ids::Isin;
use crate::domain::scorer::{HeuristicScorer, Scorer, ScoringInputs};

use super::error::ApiResult;

/// Mirrors `HeuristicScorer::score`'s fixed weighting (spec leaves the
/// formula open; this is the one bundled reference implementation's
/// weights, not a tunable runtime setting).
const WEIGHTS: [(&str, f64); 4] = [("quality", 0.3), ("opportunity", 0.25), ("fundamental", 0.25), ("technical", 0.2)];

async fn build_inputs(container: &Container, isin: &Isin) -> crate::domain::errors::SentinelResult<ScoringInputs> {
    let today = Utc::now().date_naive();
    let daily = container.price_bars.range(isin, today - chrono::Duration::days(90), today).await?;
    let monthly = container.price_bars.range(isin, today - chrono::Duration::days(730), today).await?;
    let fundamentals = container.fundamentals.fundamentals(isin).await?;
    Ok(ScoringInputs {
        daily_prices: daily,
        monthly_prices: monthly,
        pe_ratio: fundamentals.pe_ratio,
        profit_margin: fundamentals.profit_margin,
        debt_to_equity: fundamentals.debt_to_equity,
        ..Default::default()
    })
}

pub async fn components_for(State(container): State<Arc<Container>>, Path(isin): Path<String>) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&isin)?;
    let inputs = build_inputs(&container, &isin).await?;
    let breakdown = HeuristicScorer.score(&inputs);
    Ok(Json(json!({"isin": isin, "breakdown": breakdown})))
}

pub async fn components_all(State(container): State<Arc<Container>>) -> ApiResult<Json<Value>> {
    let securities = container.securities.all_active().await?;
    let mut breakdowns = HashMap::new();
    for security in securities {
        let inputs = build_inputs(&container, &security.isin).await?;
        breakdowns.insert(security.isin.to_string(), HeuristicScorer.score(&inputs));
    }
    Ok(Json(json!({"breakdowns": breakdowns})))
}

pub async fn formulas_active() -> Json<Value> {
    Json(json!({"formula": "heuristic", "description": "weighted sum of quality/opportunity/fundamental/technical components"}))
}

pub async fn weights_current() -> Json<Value> {
    let weights: HashMap<&str, f64> = WEIGHTS.into_iter().collect();
    Json(json!({"weights": weights}))
}

/// No adaptive weighting mechanism exists (spec leaves scoring weights
/// static); this honestly reports an empty history rather than fabricating
/// a learning curve.
pub async fn weights_adaptive_history() -> Json<Value> {
    Json(json!({"history": []}))
}

pub async fn score(State(container): State<Arc<Container>>, Path(isin): Path<String>) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&isin)?;
    let inputs = build_inputs(&container, &isin).await?;
    let breakdown = HeuristicScorer.score(&inputs);
    Ok(Json(json!({"isin": isin, "breakdown": breakdown})))
}

#[derive(Deserialize)]
pub struct WhatIfRequest {
    pub isin: String,
    pub pe_ratio: Option<f64>,
    pub profit_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub upside_pct: Option<f64>,
}

pub async fn score_what_if(State(container): State<Arc<Container>>, Json(body): Json<WhatIfRequest>) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&body.isin)?;
    let mut inputs = build_inputs(&container, &isin).await?;
    if body.pe_ratio.is_some() {
        inputs.pe_ratio = body.pe_ratio;
    }
    if body.profit_margin.is_some() {
        inputs.profit_margin = body.profit_margin;
    }
    if body.debt_to_equity.is_some() {
        inputs.debt_to_equity = body.debt_to_equity;
    }
    if body.upside_pct.is_some() {
        inputs.upside_pct = body.upside_pct;
    }
    let breakdown = HeuristicScorer.score(&inputs);
    Ok(Json(json!({"isin": isin, "breakdown": breakdown})))
}
