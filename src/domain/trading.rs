//! Trade execution pipeline types (spec §4.9). The seven validation layers
//! share this `ValidationContext`/`RiskValidator` seam, mirroring the
//! teacher's `RiskValidator`/`ValidationPipeline` fail-fast design but with
//! a three-way outcome (`pass`/`warn`/`deny`) instead of a binary one.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::errors::SentinelError;
use crate::domain::ids::Isin;
use crate::domain::ledger::{Side, TradingMode};
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::security::Security;

#[derive(Debug, Clone)]
pub struct TradeProposal {
    pub isin: Isin,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub expected_price: Option<Decimal>,
}

/// A denial carries the classified `SentinelError` it would surface as
/// (spec §7: "Trade refusals include `{reason, layer, details}`"), not a
/// bare message — `layer` is the validator name and `details` holds the
/// layer's structured context (e.g. the cash deficit).
#[derive(Debug)]
pub enum ValidationOutcome {
    Pass,
    Warn(String),
    Deny(SentinelError),
}

impl ValidationOutcome {
    pub fn is_denied(&self) -> bool {
        matches!(self, ValidationOutcome::Deny(_))
    }
}

/// Inputs every validator reads; none of them mutate it, so layers can run
/// fully in parallel for reporting even though the pipeline itself is
/// fail-fast and sequential.
pub struct ValidationContext<'a> {
    pub proposal: &'a TradeProposal,
    pub security: &'a Security,
    pub snapshot: &'a PortfolioSnapshot,
    pub mode: TradingMode,
    pub current_price: Decimal,
    pub account_currency: String,
    pub fx_rate_to_account: Decimal,
    pub commission: Decimal,
    pub market_open: bool,
    pub concentration_limit: Option<f64>,
}

impl<'a> ValidationContext<'a> {
    pub fn notional(&self) -> Decimal {
        self.current_price * self.proposal.quantity
    }

    pub fn required_cash(&self) -> Decimal {
        self.notional() * self.fx_rate_to_account + self.commission
    }
}

#[async_trait]
pub trait RiskValidator: Send + Sync {
    fn name(&self) -> &str;
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationOutcome;
    fn is_enabled(&self) -> bool {
        true
    }
    /// Lower runs first (spec §4.9 numbers the seven layers in fixed order).
    fn priority(&self) -> u8 {
        100
    }
}

pub struct ValidationPipeline {
    validators: Vec<Box<dyn RiskValidator>>,
}

#[derive(Debug)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub warnings: Vec<String>,
    pub checked: Vec<String>,
}

impl ValidationPipeline {
    pub fn new(validators: Vec<Box<dyn RiskValidator>>) -> Self {
        let mut validators = validators;
        validators.sort_by_key(|v| v.priority());
        Self { validators }
    }

    /// Runs every enabled validator in priority order, stopping at the
    /// first denial (spec §4.9 "fail fast"). Warnings accumulate but do not
    /// stop the pipeline.
    pub async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidationReport {
        let mut warnings = Vec::new();
        let mut checked = Vec::new();
        for validator in &self.validators {
            if !validator.is_enabled() {
                continue;
            }
            checked.push(validator.name().to_string());
            match validator.validate(ctx).await {
                ValidationOutcome::Deny(reason) => {
                    return ValidationReport {
                        outcome: ValidationOutcome::Deny(reason),
                        warnings,
                        checked,
                    };
                }
                ValidationOutcome::Warn(reason) => warnings.push(reason),
                ValidationOutcome::Pass => {}
            }
        }
        ValidationReport {
            outcome: ValidationOutcome::Pass,
            warnings,
            checked,
        }
    }
}
