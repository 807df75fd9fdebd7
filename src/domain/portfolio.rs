//! Portfolio store entities: positions and cash balances (spec §3).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::ids::Isin;

/// Virtual currency used only in research mode (spec §3).
pub const TEST_CURRENCY: &str = "TEST";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub isin: Isin,
    pub quantity: Decimal,
    pub avg_cost: Decimal,
    pub market_price: Decimal,
    pub market_value_eur: Decimal,
    pub last_update: DateTime<Utc>,
}

impl Position {
    /// A position with quantity 0 is retained for history but excluded from
    /// current-state aggregates (spec §3).
    pub fn is_current(&self) -> bool {
        self.quantity != Decimal::ZERO
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashBalance {
    pub currency: String,
    pub amount: Decimal,
}

/// A coherent snapshot of the portfolio store used to compute `portfolio_hash`
/// and to drive planning/evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub positions: HashMap<Isin, Position>,
    pub cash: HashMap<String, CashBalance>,
}

impl PortfolioSnapshot {
    pub fn current_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| p.is_current())
    }

    pub fn cash_of(&self, currency: &str) -> Decimal {
        self.cash
            .get(currency)
            .map(|c| c.amount)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn quantity_of(&self, isin: &Isin) -> Decimal {
        self.positions
            .get(isin)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_value_eur(&self) -> Decimal {
        self.current_positions()
            .map(|p| p.market_value_eur)
            .sum::<Decimal>()
            + self.cash.values().map(|c| c.amount).sum::<Decimal>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(qty: Decimal) -> Position {
        Position {
            isin: Isin::parse("US0378331005").unwrap(),
            quantity: qty,
            avg_cost: dec!(100),
            market_price: dec!(110),
            market_value_eur: dec!(110),
            last_update: Utc::now(),
        }
    }

    #[test]
    fn zero_quantity_positions_are_excluded_from_current_aggregates() {
        let mut snap = PortfolioSnapshot::default();
        let isin = Isin::parse("US0378331005").unwrap();
        snap.positions.insert(isin.clone(), position(Decimal::ZERO));
        assert_eq!(snap.current_positions().count(), 0);
        assert_eq!(snap.quantity_of(&isin), Decimal::ZERO);
    }

    #[test]
    fn total_value_sums_positions_and_cash() {
        let mut snap = PortfolioSnapshot::default();
        let isin = Isin::parse("US0378331005").unwrap();
        snap.positions.insert(isin, position(dec!(10)));
        snap.cash.insert(
            "EUR".into(),
            CashBalance {
                currency: "EUR".into(),
                amount: dec!(500),
            },
        );
        assert_eq!(snap.total_value_eur(), dec!(610));
    }
}
