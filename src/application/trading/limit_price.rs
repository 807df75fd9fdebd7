//! Limit-price computation (spec §4.9): `limit = current * (1 + slip)`,
//! `slip` defaults to +0.5% for BUY and -0.5% for SELL.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::ledger::Side;

pub const DEFAULT_SLIPPAGE: Decimal = dec!(0.005);

pub fn limit_price(current: Decimal, side: Side, slippage: Decimal) -> Decimal {
    match side {
        Side::Buy => current * (Decimal::ONE + slippage),
        Side::Sell => current * (Decimal::ONE - slippage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_limit_is_above_current() {
        let limit = limit_price(dec!(100), Side::Buy, DEFAULT_SLIPPAGE);
        assert_eq!(limit, dec!(100.500));
    }

    #[test]
    fn sell_limit_is_below_current() {
        let limit = limit_price(dec!(100), Side::Sell, DEFAULT_SLIPPAGE);
        assert_eq!(limit, dec!(99.500));
    }
}
