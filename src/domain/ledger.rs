//! Ledger store entities: append-only trades, cash flows, dividends (spec §3).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ids::Isin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::str::FromStr for Side {
    type Err = crate::domain::errors::SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(crate::domain::errors::SentinelError::validation(format!(
                "unknown side '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSource {
    Manual,
    Plan,
    Drip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Research,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub isin: Isin,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub currency: String,
    pub currency_rate: Decimal,
    pub value_eur: Decimal,
    pub executed_at: DateTime<Utc>,
    pub order_id: String,
    pub source: TradeSource,
    pub mode: TradingMode,
    pub bucket_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CashFlowType {
    Deposit,
    Withdrawal,
    Fee,
    Dividend,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlow {
    pub transaction_id: String,
    pub flow_type: CashFlowType,
    pub amount: Decimal,
    pub currency: String,
    pub amount_eur: Decimal,
    pub date: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dividend {
    pub id: i64,
    pub isin: Isin,
    pub cash_flow_transaction_id: Option<String>,
    pub reinvested: bool,
    pub reinvested_quantity: Option<Decimal>,
    pub pending_bonus: Decimal,
    pub bonus_cleared: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_round_trips_through_string() {
        assert_eq!("BUY".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("sell".parse::<Side>().unwrap(), Side::Sell);
        assert!("HOLD".parse::<Side>().is_err());
    }
}
