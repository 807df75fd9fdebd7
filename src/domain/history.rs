//! History store entities: price bars and FX rates (spec §3).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ids::Isin;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub isin: Isin,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub adjusted_close: Decimal,
    pub volume: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxRate {
    pub from_currency: String,
    pub to_currency: String,
    pub date: NaiveDate,
    pub rate: Decimal,
}
