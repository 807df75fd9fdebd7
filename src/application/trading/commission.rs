//! Commission calculation (spec §4.9 layer 5): `total = fixed + pct * notional`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy)]
pub struct CommissionSchedule {
    pub fixed: Decimal,
    pub pct: Decimal,
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self {
            fixed: dec!(2.0),
            pct: dec!(0.002),
        }
    }
}

impl CommissionSchedule {
    pub fn calculate(&self, notional: Decimal) -> Decimal {
        self.fixed + self.pct * notional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_matches_spec_constants() {
        let schedule = CommissionSchedule::default();
        assert_eq!(schedule.calculate(dec!(1000)), dec!(4.0));
    }
}
