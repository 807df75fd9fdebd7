//! Opportunity engine types: `ActionCandidate` and `ActionSequence` (spec §3, §4.7-4.8).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::ids::Isin;
use crate::domain::ledger::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    ProfitTaking,
    AveragingDown,
    OpportunityBuy,
    RebalanceSell,
    RebalanceBuy,
    WeightBased,
}

impl ActionCategory {
    pub fn all() -> [ActionCategory; 6] {
        [
            ActionCategory::ProfitTaking,
            ActionCategory::AveragingDown,
            ActionCategory::OpportunityBuy,
            ActionCategory::RebalanceSell,
            ActionCategory::RebalanceBuy,
            ActionCategory::WeightBased,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCandidate {
    pub isin: Isin,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub value_eur: Decimal,
    /// Calculator-specific signal strength in [0, 1].
    pub priority: f64,
    pub category: ActionCategory,
}

/// Map of calculator category to its generated candidates (spec §4.7).
pub type OpportunitiesByCategory = HashMap<ActionCategory, Vec<ActionCandidate>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    SingleAction,
    Mixed,
    SellThenBuy,
    BuyThenSell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSequence {
    pub steps: Vec<ActionCandidate>,
    pub depth: usize,
    pub pattern_type: PatternType,
}

impl ActionSequence {
    pub fn contains_isin(&self, isin: &Isin) -> bool {
        self.steps.iter().any(|s| &s.isin == isin)
    }

    pub fn classify_pattern(steps: &[ActionCandidate]) -> PatternType {
        if steps.len() <= 1 {
            return PatternType::SingleAction;
        }
        let first_side = steps[0].side;
        if steps.iter().all(|s| s.side == first_side) {
            return PatternType::Mixed;
        }
        if first_side == Side::Sell {
            PatternType::SellThenBuy
        } else {
            PatternType::BuyThenSell
        }
    }
}
