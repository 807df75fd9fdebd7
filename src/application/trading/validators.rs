//! The seven trade validation layers (spec §4.9), in priority order.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::errors::SentinelError;
use crate::domain::ledger::{Side, TradingMode};
use crate::domain::trading::{RiskValidator, ValidationContext, ValidationOutcome};

/// Layer 1: research mode refuses live BUY/SELL; a TEST-currency path is
/// allowed through untouched.
pub struct ModeGateValidator;

#[async_trait]
impl RiskValidator for ModeGateValidator {
    fn name(&self) -> &str {
        "mode_gate"
    }
    fn priority(&self) -> u8 {
        1
    }
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        if ctx.mode == TradingMode::Research && ctx.account_currency != crate::domain::portfolio::TEST_CURRENCY {
            return ValidationOutcome::Deny(
                SentinelError::forbidden("Trading disabled in research mode").with_layer("mode_gate"),
            );
        }
        ValidationOutcome::Pass
    }
}

/// Layer 2: security must be active, tradeable in the requested direction,
/// and the quantity must be a whole multiple of its minimum lot.
pub struct SecurityEligibilityValidator;

#[async_trait]
impl RiskValidator for SecurityEligibilityValidator {
    fn name(&self) -> &str {
        "security_eligibility"
    }
    fn priority(&self) -> u8 {
        2
    }
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        let security = ctx.security;
        if !security.active {
            return ValidationOutcome::Deny(
                SentinelError::validation(format!("{} is not active", security.isin)).with_layer("security_eligibility"),
            );
        }
        let tradeable = match ctx.proposal.side {
            Side::Buy => security.is_tradeable_buy(),
            Side::Sell => security.is_tradeable_sell(),
        };
        if !tradeable {
            return ValidationOutcome::Deny(
                SentinelError::validation(format!("{} does not allow {:?}", security.isin, ctx.proposal.side))
                    .with_layer("security_eligibility"),
            );
        }
        if security.min_lot > Decimal::ZERO && (ctx.proposal.quantity % security.min_lot) != Decimal::ZERO {
            return ValidationOutcome::Deny(
                SentinelError::validation(format!(
                    "quantity {} is not a multiple of the minimum lot {}",
                    ctx.proposal.quantity, security.min_lot
                ))
                .with_layer("security_eligibility"),
            );
        }
        ValidationOutcome::Pass
    }
}

/// Layer 3: market-hours gate. The caller resolves `market_open` via the
/// market hours service (spec §4.5) before the pipeline runs.
pub struct MarketHoursValidator {
    pub requires_market_hours: bool,
}

#[async_trait]
impl RiskValidator for MarketHoursValidator {
    fn name(&self) -> &str {
        "market_hours"
    }
    fn priority(&self) -> u8 {
        3
    }
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        if self.requires_market_hours && !ctx.market_open {
            return ValidationOutcome::Deny(
                SentinelError::market_closed(format!("{} is closed", ctx.security.exchange_code)).with_layer("market_hours"),
            );
        }
        ValidationOutcome::Pass
    }
}

/// Layer 4: cash sufficiency. BUY requires `quantity * price * fx + commission`
/// in the account currency; SELL is always sufficient.
pub struct CashSufficiencyValidator;

#[async_trait]
impl RiskValidator for CashSufficiencyValidator {
    fn name(&self) -> &str {
        "cash_sufficiency"
    }
    fn priority(&self) -> u8 {
        4
    }
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        if ctx.proposal.side == Side::Sell {
            return ValidationOutcome::Pass;
        }
        let available = ctx.snapshot.cash_of(&ctx.account_currency);
        let required = ctx.required_cash();
        if required > available {
            return ValidationOutcome::Deny(SentinelError::insufficient_funds(required - available).with_layer("cash_sufficiency"));
        }
        ValidationOutcome::Pass
    }
}

/// Layer 5: commission sanity check. The commission itself is computed by
/// `commission::CommissionSchedule` before the pipeline runs and feeds into
/// layer 4's `required_cash`; this layer only guards against a pathological
/// commission that would exceed the trade's own notional.
pub struct CommissionValidator;

#[async_trait]
impl RiskValidator for CommissionValidator {
    fn name(&self) -> &str {
        "commission"
    }
    fn priority(&self) -> u8 {
        5
    }
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        let notional = ctx.notional();
        if notional > Decimal::ZERO && ctx.commission > notional {
            return ValidationOutcome::Warn(format!(
                "commission {} exceeds trade notional {}",
                ctx.commission, notional
            ));
        }
        ValidationOutcome::Pass
    }
}

/// Layer 6: simulates the post-state across every account currency and
/// refuses anything that would drive a balance negative, and SELLs that
/// exceed the currently held quantity.
pub struct PositionLimitsValidator;

#[async_trait]
impl RiskValidator for PositionLimitsValidator {
    fn name(&self) -> &str {
        "position_limits"
    }
    fn priority(&self) -> u8 {
        6
    }
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        match ctx.proposal.side {
            Side::Sell => {
                let held = ctx.snapshot.quantity_of(&ctx.proposal.isin);
                if ctx.proposal.quantity > held {
                    return ValidationOutcome::Deny(
                        SentinelError::insufficient_quantity(format!(
                            "cannot sell {} shares, only {held} held",
                            ctx.proposal.quantity
                        ))
                        .with_layer("position_limits"),
                    );
                }
            }
            Side::Buy => {
                let post = ctx.snapshot.cash_of(&ctx.account_currency) - ctx.required_cash();
                if post.is_sign_negative() {
                    return ValidationOutcome::Deny(SentinelError::insufficient_funds(-post).with_layer("position_limits"));
                }
            }
        }
        ValidationOutcome::Pass
    }
}

/// Layer 7: optional concentration guard. Refuses a BUY that would push the
/// resulting position above `concentration_limit` of the portfolio's total
/// value. Disabled when no limit is configured (spec §4.9: "Optional").
pub struct ConcentrationValidator;

#[async_trait]
impl RiskValidator for ConcentrationValidator {
    fn name(&self) -> &str {
        "concentration"
    }
    fn priority(&self) -> u8 {
        7
    }
    fn is_enabled(&self) -> bool {
        true
    }
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome {
        let Some(limit) = ctx.concentration_limit else {
            return ValidationOutcome::Pass;
        };
        if ctx.proposal.side != Side::Buy {
            return ValidationOutcome::Pass;
        }
        let total = ctx.snapshot.total_value_eur();
        if total <= Decimal::ZERO {
            return ValidationOutcome::Pass;
        }
        let held_value = ctx
            .snapshot
            .positions
            .get(&ctx.proposal.isin)
            .map(|p| p.market_value_eur)
            .unwrap_or(Decimal::ZERO);
        let post_value = held_value + ctx.notional();
        let share = post_value / total;
        if share > Decimal::try_from(limit).unwrap_or(Decimal::MAX) {
            return ValidationOutcome::Deny(
                SentinelError::validation(format!(
                    "{} would reach {:.1}% of the portfolio, above the {:.1}% concentration limit",
                    ctx.proposal.isin,
                    share * Decimal::from(100),
                    limit * 100.0
                ))
                .with_layer("concentration"),
            );
        }
        ValidationOutcome::Pass
    }
}

pub fn default_pipeline(requires_market_hours: bool, concentration_enabled: bool) -> Vec<Box<dyn RiskValidator>> {
    let mut validators: Vec<Box<dyn RiskValidator>> = vec![
        Box::new(ModeGateValidator),
        Box::new(SecurityEligibilityValidator),
        Box::new(MarketHoursValidator { requires_market_hours }),
        Box::new(CashSufficiencyValidator),
        Box::new(CommissionValidator),
        Box::new(PositionLimitsValidator),
    ];
    if concentration_enabled {
        validators.push(Box::new(ConcentrationValidator));
    }
    validators
}
