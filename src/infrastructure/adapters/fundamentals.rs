//! In-memory `FundamentalsSource`. A real fundamentals-data vendor
//! integration is out of scope (spec §1); this returns whatever has been
//! seeded, or a default struct of `None`s.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::errors::SentinelResult;
use crate::domain::ids::Isin;
use crate::domain::ports::{Fundamentals, FundamentalsSource};

pub struct InMemoryFundamentalsSource {
    data: RwLock<HashMap<Isin, Fundamentals>>,
}

impl InMemoryFundamentalsSource {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub async fn seed(&self, isin: Isin, fundamentals: Fundamentals) {
        self.data.write().await.insert(isin, fundamentals);
    }
}

impl Default for InMemoryFundamentalsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FundamentalsSource for InMemoryFundamentalsSource {
    async fn fundamentals(&self, isin: &Isin) -> SentinelResult<Fundamentals> {
        Ok(self.data.read().await.get(isin).cloned().unwrap_or_default())
    }
}
