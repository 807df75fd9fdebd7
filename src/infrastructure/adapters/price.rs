//! In-memory `PriceSource`. Live market-data vendor integration is out of
//! scope (spec §1); this serves whatever quotes are seeded into it, which
//! the historical sync job populates from the broker adapter.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::errors::SentinelResult;
use crate::domain::ports::PriceSource;

pub struct InMemoryPriceSource {
    label: String,
    quotes: RwLock<HashMap<String, Decimal>>,
}

impl InMemoryPriceSource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            quotes: RwLock::new(HashMap::new()),
        }
    }

    pub async fn seed(&self, symbol: impl Into<String>, price: Decimal) {
        self.quotes.write().await.insert(symbol.into(), price);
    }
}

#[async_trait]
impl PriceSource for InMemoryPriceSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn batch_quote(&self, symbols: &[String]) -> SentinelResult<HashMap<String, Decimal>> {
        let quotes = self.quotes.read().await;
        Ok(symbols
            .iter()
            .filter_map(|s| quotes.get(s).map(|p| (s.clone(), *p)))
            .collect())
    }
}
