//! In-memory `FxSource` seeded with fixed rates. A real FX vendor
//! integration is out of scope (spec §1).

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::errors::{SentinelError, SentinelResult};
use crate::domain::ports::FxSource;

pub struct StaticFxSource {
    rates: RwLock<HashMap<(String, String), Decimal>>,
}

impl StaticFxSource {
    pub fn new() -> Self {
        Self {
            rates: RwLock::new(HashMap::new()),
        }
    }

    pub async fn seed(&self, from: impl Into<String>, to: impl Into<String>, rate: Decimal) {
        self.rates.write().await.insert((from.into(), to.into()), rate);
    }
}

impl Default for StaticFxSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FxSource for StaticFxSource {
    async fn current_rate(&self, from: &str, to: &str) -> SentinelResult<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .read()
            .await
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| SentinelError::dependency_down(format!("no fx rate seeded for {from}/{to}")))
    }

    async fn historical_rate(&self, from: &str, to: &str, _date: NaiveDate) -> SentinelResult<Decimal> {
        self.current_rate(from, to).await
    }
}
