//! C6: security universe maintenance — refreshing tradeable flags, tags,
//! and group allocation targets (spec §4.6).

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::SentinelResult;
use crate::domain::ids::Isin;
use crate::domain::repositories::{GroupTargetRepository, SecurityRepository};
use crate::domain::security::{normalize_targets, GroupKind, GroupTarget, Security};

pub struct SecurityService {
    securities: Arc<dyn SecurityRepository>,
    targets: Arc<dyn GroupTargetRepository>,
}

impl SecurityService {
    pub fn new(securities: Arc<dyn SecurityRepository>, targets: Arc<dyn GroupTargetRepository>) -> Self {
        Self { securities, targets }
    }

    pub async fn upsert(&self, security: Security) -> SentinelResult<()> {
        self.securities.upsert(&security).await
    }

    pub async fn set_tradeable(&self, isin: &Isin, active: bool) -> SentinelResult<()> {
        self.securities.set_active(isin, active).await
    }

    pub async fn set_group_target(&self, target: GroupTarget) -> SentinelResult<()> {
        self.targets.upsert(&target).await
    }

    /// Per-kind normalized weights, read fresh on every call (spec §3
    /// invariant: "per-kind weights normalize to 1 at read time").
    pub async fn normalized_targets(&self, kind: GroupKind) -> SentinelResult<HashMap<String, f64>> {
        let all = self.targets.all().await?;
        Ok(normalize_targets(&all, kind))
    }

    pub async fn active_universe(&self) -> SentinelResult<Vec<Security>> {
        self.securities.all_active().await
    }
}
