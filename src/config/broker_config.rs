//! Mock broker seed configuration parsing from environment variables.
//!
//! Real broker credentials are explicitly out of scope (spec §1 Non-goals:
//! concrete broker SDK wiring); the only knob this service exposes is the
//! starting cash balance the in-memory broker adapter is seeded with.

use std::env;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct BrokerEnvConfig {
    pub starting_cash_eur: Decimal,
}

impl Default for BrokerEnvConfig {
    fn default() -> Self {
        Self {
            starting_cash_eur: dec!(100000),
        }
    }
}

impl BrokerEnvConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let default = Self::default();
        let starting_cash_eur = match env::var("SENTINEL_STARTING_CASH_EUR") {
            Ok(v) => {
                let parsed = v
                    .parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("invalid SENTINEL_STARTING_CASH_EUR: {e}"))?;
                Decimal::from_f64(parsed).unwrap_or(default.starting_cash_eur)
            }
            Err(_) => default.starting_cash_eur,
        };
        Ok(Self { starting_cash_eur })
    }
}
