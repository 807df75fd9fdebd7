//! Stable fingerprints (spec §3, §4.8, §4.10, P3).
//!
//! All hashes are computed over a canonical byte form: sort keys first,
//! then serialize with fixed field order and no floating whitespace, then
//! SHA-256 and hex-encode. This makes the result invariant under input
//! permutation or formatting, which is what P3 requires.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::domain::ids::Isin;
use crate::domain::ledger::Side;
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::security::GroupTarget;

fn hex_digest(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// `portfolio_hash = H(sorted((ISIN, quantity)), sorted((currency, amount)))`.
pub fn portfolio_hash(snapshot: &PortfolioSnapshot, targets: &[GroupTarget]) -> String {
    let mut positions: Vec<(String, String)> = snapshot
        .positions
        .values()
        .filter(|p| p.is_current())
        .map(|p| (p.isin.to_string(), p.quantity.normalize().to_string()))
        .collect();
    positions.sort();

    let mut cash: Vec<(String, String)> = snapshot
        .cash
        .values()
        .map(|c| (c.currency.clone(), c.amount.normalize().to_string()))
        .collect();
    cash.sort();

    let mut target_strs: Vec<String> = targets
        .iter()
        .map(|t| format!("{}:{}:{}", t.kind.as_str(), t.name, t.target_weight))
        .collect();
    target_strs.sort();

    let canonical = format!(
        "positions=[{}];cash=[{}];targets=[{}]",
        positions
            .iter()
            .map(|(i, q)| format!("{i}:{q}"))
            .collect::<Vec<_>>()
            .join(","),
        cash.iter()
            .map(|(c, a)| format!("{c}:{a}"))
            .collect::<Vec<_>>()
            .join(","),
        target_strs.join(",")
    );
    hex_digest(&canonical)
}

#[derive(Debug, Clone)]
pub struct CanonicalAction {
    pub isin: Isin,
    pub side: Side,
    pub quantity: Decimal,
}

/// `sequence_hash`: ordered list of `(ISIN, side, quantity)` canonicalized.
/// Unlike `portfolio_hash`, order is significant — a sequence is a plan,
/// not a set — so the steps are hashed in their given order.
pub fn sequence_hash(actions: &[CanonicalAction]) -> String {
    let canonical = actions
        .iter()
        .map(|a| format!("{}:{}:{}", a.isin, a.side.as_str(), a.quantity.normalize()))
        .collect::<Vec<_>>()
        .join("|");
    hex_digest(&canonical)
}

/// `universe_state_hash = H(sorted(active_ISINs), targets_fingerprint)` (spec §4.10).
pub fn universe_state_hash(active_isins: &[Isin], targets: &[GroupTarget]) -> String {
    let mut isins: Vec<String> = active_isins.iter().map(|i| i.to_string()).collect();
    isins.sort();

    let mut target_strs: Vec<String> = targets
        .iter()
        .map(|t| format!("{}:{}:{}", t.kind.as_str(), t.name, t.target_weight))
        .collect();
    target_strs.sort();

    let canonical = format!("isins=[{}];targets=[{}]", isins.join(","), target_strs.join(","));
    hex_digest(&canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::{CashBalance, Position};
    use crate::domain::security::GroupKind;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn snapshot_with(isin: &str, qty: rust_decimal::Decimal, cash_eur: rust_decimal::Decimal) -> PortfolioSnapshot {
        let mut snap = PortfolioSnapshot::default();
        let id = Isin::parse(isin).unwrap();
        snap.positions.insert(
            id.clone(),
            Position {
                isin: id,
                quantity: qty,
                avg_cost: dec!(1),
                market_price: dec!(1),
                market_value_eur: dec!(1),
                last_update: Utc::now(),
            },
        );
        snap.cash.insert(
            "EUR".into(),
            CashBalance {
                currency: "EUR".into(),
                amount: cash_eur,
            },
        );
        snap
    }

    #[test]
    fn portfolio_hash_is_stable_under_representation() {
        let targets = vec![GroupTarget {
            kind: GroupKind::Country,
            name: "US".into(),
            target_weight: 1.0,
        }];
        let snap = snapshot_with("US0378331005", dec!(10), dec!(500));
        let h1 = portfolio_hash(&snap, &targets);
        let h2 = portfolio_hash(&snap, &targets);
        assert_eq!(h1, h2);
    }

    #[test]
    fn portfolio_hash_changes_with_quantity() {
        let targets = vec![];
        let snap_a = snapshot_with("US0378331005", dec!(10), dec!(500));
        let snap_b = snapshot_with("US0378331005", dec!(11), dec!(500));
        assert_ne!(portfolio_hash(&snap_a, &targets), portfolio_hash(&snap_b, &targets));
    }

    #[test]
    fn sequence_hash_is_order_sensitive() {
        let a = CanonicalAction {
            isin: Isin::parse("US0378331005").unwrap(),
            side: Side::Buy,
            quantity: dec!(1),
        };
        let b = CanonicalAction {
            isin: Isin::parse("DE0007164600").unwrap(),
            side: Side::Sell,
            quantity: dec!(2),
        };
        let forward = sequence_hash(&[a.clone(), b.clone()]);
        let backward = sequence_hash(&[b, a]);
        assert_ne!(forward, backward);
    }
}
