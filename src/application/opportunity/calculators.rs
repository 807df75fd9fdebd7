//! The six opportunity calculators (spec §4.7), each a pure function over a
//! portfolio snapshot, the active universe, and normalized group targets.
//! They never touch a store directly, which is what makes them unit
//! testable without a database.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::ledger::Side;
use crate::domain::opportunity::{ActionCandidate, ActionCategory};
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::security::Security;

/// Sells a position trading at or above `gain_threshold` over its average
/// cost (spec §4.7 "profit taking").
pub fn profit_taking(
    snapshot: &PortfolioSnapshot,
    securities: &HashMap<String, Security>,
    gain_threshold: f64,
) -> Vec<ActionCandidate> {
    snapshot
        .current_positions()
        .filter_map(|p| {
            let security = securities.get(p.isin.as_str())?;
            if !security.is_tradeable_sell() || p.avg_cost <= Decimal::ZERO {
                return None;
            }
            let gain = ((p.market_price - p.avg_cost) / p.avg_cost).to_f64().unwrap_or(0.0);
            if gain < gain_threshold {
                return None;
            }
            Some(ActionCandidate {
                isin: p.isin.clone(),
                symbol: security.symbol.clone(),
                side: Side::Sell,
                quantity: p.quantity,
                value_eur: p.market_value_eur,
                priority: gain.min(1.0),
                category: ActionCategory::ProfitTaking,
            })
        })
        .collect()
}

/// Buys more of a position trading below `loss_threshold` under its
/// average cost, provided cash is available (spec §4.7 "averaging down").
pub fn averaging_down(
    snapshot: &PortfolioSnapshot,
    securities: &HashMap<String, Security>,
    loss_threshold: f64,
    lot_value_eur: Decimal,
) -> Vec<ActionCandidate> {
    snapshot
        .current_positions()
        .filter_map(|p| {
            let security = securities.get(p.isin.as_str())?;
            if !security.is_tradeable_buy() || p.avg_cost <= Decimal::ZERO {
                return None;
            }
            let loss = ((p.market_price - p.avg_cost) / p.avg_cost).to_f64().unwrap_or(0.0);
            if loss > -loss_threshold.abs() {
                return None;
            }
            let quantity = (lot_value_eur / p.market_price.max(dec!(0.01))).round();
            if quantity <= Decimal::ZERO {
                return None;
            }
            Some(ActionCandidate {
                isin: p.isin.clone(),
                symbol: security.symbol.clone(),
                side: Side::Buy,
                quantity,
                value_eur: quantity * p.market_price,
                priority: loss.abs().min(1.0),
                category: ActionCategory::AveragingDown,
            })
        })
        .collect()
}

/// Opens a new position in a universe security not currently held,
/// weighted by the scorer's momentum signal (spec §4.7 "opportunity buys").
pub fn opportunity_buys(
    snapshot: &PortfolioSnapshot,
    securities: &HashMap<String, Security>,
    scores: &HashMap<String, f64>,
    lot_value_eur: Decimal,
    min_score: f64,
) -> Vec<ActionCandidate> {
    securities
        .values()
        .filter(|s| s.is_tradeable_buy() && snapshot.quantity_of(&s.isin) == Decimal::ZERO)
        .filter_map(|s| {
            let score = *scores.get(s.isin.as_str())?;
            if score < min_score {
                return None;
            }
            let price = dec!(1); // actual market price comes from the price source at call time
            let quantity = (lot_value_eur / price).round();
            Some(ActionCandidate {
                isin: s.isin.clone(),
                symbol: s.symbol.clone(),
                side: Side::Buy,
                quantity,
                value_eur: lot_value_eur,
                priority: score,
                category: ActionCategory::OpportunityBuy,
            })
        })
        .collect()
}

/// Sells down positions whose group allocation exceeds target (spec §4.7
/// "rebalance sells").
pub fn rebalance_sells(
    snapshot: &PortfolioSnapshot,
    securities: &HashMap<String, Security>,
    current_weights: &HashMap<String, f64>,
    target_weights: &HashMap<String, f64>,
    group_of: impl Fn(&Security) -> Option<String>,
) -> Vec<ActionCandidate> {
    snapshot
        .current_positions()
        .filter_map(|p| {
            let security = securities.get(p.isin.as_str())?;
            if !security.is_tradeable_sell() {
                return None;
            }
            let group = group_of(security)?;
            let current = *current_weights.get(&group).unwrap_or(&0.0);
            let target = *target_weights.get(&group).unwrap_or(&0.0);
            let overshoot = current - target;
            if overshoot <= 0.0 {
                return None;
            }
            let trim_value = p.market_value_eur * Decimal::try_from(overshoot.min(1.0)).unwrap_or(Decimal::ZERO);
            let quantity = (trim_value / p.market_price.max(dec!(0.01))).round();
            if quantity <= Decimal::ZERO {
                return None;
            }
            Some(ActionCandidate {
                isin: p.isin.clone(),
                symbol: security.symbol.clone(),
                side: Side::Sell,
                quantity: quantity.min(p.quantity),
                value_eur: quantity * p.market_price,
                priority: overshoot.min(1.0),
                category: ActionCategory::RebalanceSell,
            })
        })
        .collect()
}

/// Buys into underweight groups (spec §4.7 "rebalance buys").
pub fn rebalance_buys(
    securities: &HashMap<String, Security>,
    current_weights: &HashMap<String, f64>,
    target_weights: &HashMap<String, f64>,
    group_of: impl Fn(&Security) -> Option<String>,
    lot_value_eur: Decimal,
) -> Vec<ActionCandidate> {
    securities
        .values()
        .filter(|s| s.is_tradeable_buy())
        .filter_map(|s| {
            let group = group_of(s)?;
            let current = *current_weights.get(&group).unwrap_or(&0.0);
            let target = *target_weights.get(&group).unwrap_or(&0.0);
            let shortfall = target - current;
            if shortfall <= 0.0 {
                return None;
            }
            let quantity = (lot_value_eur / dec!(1)).round();
            Some(ActionCandidate {
                isin: s.isin.clone(),
                symbol: s.symbol.clone(),
                side: Side::Buy,
                quantity,
                value_eur: lot_value_eur,
                priority: shortfall.min(1.0),
                category: ActionCategory::RebalanceBuy,
            })
        })
        .collect()
}

/// General weight-based top-up/trim toward each held security's own target
/// weight within its group (spec §4.7 "weight based").
pub fn weight_based(
    snapshot: &PortfolioSnapshot,
    securities: &HashMap<String, Security>,
    ideal_weight: impl Fn(&Security) -> Option<f64>,
) -> Vec<ActionCandidate> {
    let total = snapshot.total_value_eur();
    if total <= Decimal::ZERO {
        return Vec::new();
    }
    snapshot
        .current_positions()
        .filter_map(|p| {
            let security = securities.get(p.isin.as_str())?;
            let ideal = ideal_weight(security)?;
            let current = (p.market_value_eur / total).to_f64().unwrap_or(0.0);
            let diff = ideal - current;
            if diff.abs() < 0.01 {
                return None;
            }
            let side = if diff > 0.0 { Side::Buy } else { Side::Sell };
            if side == Side::Sell && !security.is_tradeable_sell() {
                return None;
            }
            if side == Side::Buy && !security.is_tradeable_buy() {
                return None;
            }
            let delta_value = total * Decimal::try_from(diff.abs().min(1.0)).unwrap_or(Decimal::ZERO);
            let quantity = (delta_value / p.market_price.max(dec!(0.01))).round();
            if quantity <= Decimal::ZERO {
                return None;
            }
            Some(ActionCandidate {
                isin: p.isin.clone(),
                symbol: security.symbol.clone(),
                side,
                quantity: if side == Side::Sell { quantity.min(p.quantity) } else { quantity },
                value_eur: quantity * p.market_price,
                priority: diff.abs().min(1.0),
                category: ActionCategory::WeightBased,
            })
        })
        .collect()
}
