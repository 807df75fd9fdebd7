//! Universe store entities: `Security` and `GroupTarget` (spec §3).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::SentinelError;
use crate::domain::ids::Isin;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductType {
    Equity,
    Etf,
    Mutualfund,
    Etc,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub isin: Isin,
    pub symbol: String,
    pub name: String,
    pub exchange_code: String,
    pub currency: String,
    pub country: String,
    pub industry: String,
    pub product_type: ProductType,
    pub min_lot: rust_decimal::Decimal,
    pub active: bool,
    pub allow_buy: bool,
    pub allow_sell: bool,
    pub tags: HashSet<String>,
    pub last_synced: Option<DateTime<Utc>>,
}

impl Security {
    pub fn is_tradeable_buy(&self) -> bool {
        self.active && self.allow_buy
    }

    pub fn is_tradeable_sell(&self) -> bool {
        self.active && self.allow_sell
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Country,
    Industry,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Country => "country",
            GroupKind::Industry => "industry",
        }
    }
}

impl std::str::FromStr for GroupKind {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "country" => Ok(GroupKind::Country),
            "industry" => Ok(GroupKind::Industry),
            other => Err(SentinelError::validation(format!(
                "unknown group kind '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTarget {
    pub kind: GroupKind,
    pub name: String,
    pub target_weight: f64,
}

/// Normalizes a set of raw target weights for one kind so they sum to 1
/// (spec §3 invariant: "per-kind weights normalize to 1 at read time").
/// An empty input normalizes to an empty map.
pub fn normalize_targets(targets: &[GroupTarget], kind: GroupKind) -> HashMap<String, f64> {
    let relevant: Vec<&GroupTarget> = targets.iter().filter(|t| t.kind == kind).collect();
    let total: f64 = relevant.iter().map(|t| t.target_weight.max(0.0)).sum();
    if total <= 0.0 {
        return HashMap::new();
    }
    relevant
        .into_iter()
        .map(|t| (t.name.clone(), t.target_weight.max(0.0) / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_targets_sums_to_one() {
        let targets = vec![
            GroupTarget {
                kind: GroupKind::Country,
                name: "US".into(),
                target_weight: 0.3,
            },
            GroupTarget {
                kind: GroupKind::Country,
                name: "DE".into(),
                target_weight: 0.1,
            },
        ];
        let normalized = normalize_targets(&targets, GroupKind::Country);
        let total: f64 = normalized.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((normalized["US"] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn normalize_targets_ignores_other_kind() {
        let targets = vec![GroupTarget {
            kind: GroupKind::Industry,
            name: "Tech".into(),
            target_weight: 1.0,
        }];
        assert!(normalize_targets(&targets, GroupKind::Country).is_empty());
    }
}
