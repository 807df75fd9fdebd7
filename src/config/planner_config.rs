//! Planning pipeline and trade execution configuration (spec §4.8, §4.9).

use std::env;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;

use crate::application::planning::{GeneratorConfig, PlanningConfig};
use crate::application::trading::TradeExecutionConfig;
use crate::application::trading::commission::CommissionSchedule;

#[derive(Debug, Clone)]
pub struct PlannerEnvConfig {
    pub max_depth: usize,
    pub max_sequences: usize,
    pub evaluation_fan_out: usize,
    pub commission_fixed: Decimal,
    pub commission_pct: Decimal,
    pub slippage: Decimal,
    pub requires_market_hours: bool,
    pub concentration_limit: Option<f64>,
    pub prune_infeasible: bool,
}

impl Default for PlannerEnvConfig {
    fn default() -> Self {
        let generator = GeneratorConfig::default();
        let planning = PlanningConfig::default();
        let commission = CommissionSchedule::default();
        Self {
            max_depth: generator.max_depth,
            max_sequences: generator.max_sequences,
            evaluation_fan_out: planning.evaluation_fan_out,
            commission_fixed: commission.fixed,
            commission_pct: commission.pct,
            slippage: dec!(0.005),
            requires_market_hours: true,
            concentration_limit: None,
            prune_infeasible: true,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v.parse::<T>().map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

impl PlannerEnvConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let default = Self::default();

        let commission_fixed = match env::var("SENTINEL_COMMISSION_FIXED") {
            Ok(v) => Decimal::from_f64(
                v.parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("invalid SENTINEL_COMMISSION_FIXED: {e}"))?,
            )
            .unwrap_or(default.commission_fixed),
            Err(_) => default.commission_fixed,
        };
        let commission_pct = match env::var("SENTINEL_COMMISSION_PCT") {
            Ok(v) => Decimal::from_f64(
                v.parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("invalid SENTINEL_COMMISSION_PCT: {e}"))?,
            )
            .unwrap_or(default.commission_pct),
            Err(_) => default.commission_pct,
        };
        let slippage = match env::var("SENTINEL_SLIPPAGE_PCT") {
            Ok(v) => Decimal::from_f64(
                v.parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("invalid SENTINEL_SLIPPAGE_PCT: {e}"))?,
            )
            .unwrap_or(default.slippage),
            Err(_) => default.slippage,
        };
        let concentration_limit = match env::var("SENTINEL_CONCENTRATION_LIMIT") {
            Ok(v) => Some(
                v.parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("invalid SENTINEL_CONCENTRATION_LIMIT: {e}"))?,
            ),
            Err(_) => default.concentration_limit,
        };

        Ok(Self {
            max_depth: parse_env("SENTINEL_PLANNER_MAX_DEPTH", default.max_depth)?,
            max_sequences: parse_env("SENTINEL_PLANNER_MAX_SEQUENCES", default.max_sequences)?,
            evaluation_fan_out: parse_env("SENTINEL_PLANNER_FAN_OUT", default.evaluation_fan_out)?,
            commission_fixed,
            commission_pct,
            slippage,
            requires_market_hours: parse_env("SENTINEL_REQUIRE_MARKET_HOURS", default.requires_market_hours)?,
            concentration_limit,
            prune_infeasible: parse_env("SENTINEL_PLANNER_PRUNE_INFEASIBLE", default.prune_infeasible)?,
        })
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            max_depth: self.max_depth,
            max_sequences: self.max_sequences,
            prune_infeasible: self.prune_infeasible,
        }
    }

    pub fn planning_config(&self) -> PlanningConfig {
        PlanningConfig {
            evaluation_fan_out: self.evaluation_fan_out,
        }
    }

    pub fn trade_execution_config(&self) -> TradeExecutionConfig {
        TradeExecutionConfig {
            commission: CommissionSchedule {
                fixed: self.commission_fixed,
                pct: self.commission_pct,
            },
            slippage: self.slippage,
            requires_market_hours: self.requires_market_hours,
            concentration_limit: self.concentration_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_bounded_fan_out_of_four() {
        assert_eq!(PlannerEnvConfig::default().evaluation_fan_out, 4);
    }
}
