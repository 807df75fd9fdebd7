//! Market identifier codes and status types consumed by the market-hours
//! service (spec §4.5).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The configured set of MICs (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mic {
    Xnys,
    Xnas,
    Xetr,
    Xlon,
    Xpar,
    Xams,
    Xmil,
    Xcse,
    Asex,
    Xhkg,
    Xshg,
    Xtse,
    Xasx,
}

impl Mic {
    pub fn code(&self) -> &'static str {
        match self {
            Mic::Xnys => "XNYS",
            Mic::Xnas => "XNAS",
            Mic::Xetr => "XETR",
            Mic::Xlon => "XLON",
            Mic::Xpar => "XPAR",
            Mic::Xams => "XAMS",
            Mic::Xmil => "XMIL",
            Mic::Xcse => "XCSE",
            Mic::Asex => "ASEX",
            Mic::Xhkg => "XHKG",
            Mic::Xshg => "XSHG",
            Mic::Xtse => "XTSE",
            Mic::Xasx => "XASX",
        }
    }

    pub fn all() -> [Mic; 13] {
        [
            Mic::Xnys,
            Mic::Xnas,
            Mic::Xetr,
            Mic::Xlon,
            Mic::Xpar,
            Mic::Xams,
            Mic::Xmil,
            Mic::Xcse,
            Mic::Asex,
            Mic::Xhkg,
            Mic::Xshg,
            Mic::Xtse,
            Mic::Xasx,
        ]
    }

    /// IANA timezone name for the exchange's local trading calendar.
    pub fn timezone(&self) -> &'static str {
        match self {
            Mic::Xnys | Mic::Xnas | Mic::Xtse => "America/New_York",
            Mic::Xetr => "Europe/Berlin",
            Mic::Xlon => "Europe/London",
            Mic::Xpar | Mic::Xams => "Europe/Paris",
            Mic::Xmil => "Europe/Rome",
            Mic::Xcse => "Europe/Copenhagen",
            Mic::Asex => "Europe/Athens",
            Mic::Xhkg => "Asia/Hong_Kong",
            Mic::Xshg => "Asia/Shanghai",
            Mic::Xasx => "Australia/Sydney",
        }
    }

    pub fn parse(code: &str) -> Option<Mic> {
        Self::all().into_iter().find(|m| m.code() == code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStatus {
    pub mic: String,
    pub open: bool,
    pub timezone: String,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub opens_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingWindowValidation {
    pub can_trade: bool,
    pub market_open: bool,
    pub requires_market_hours: bool,
    pub checked_at: DateTime<Utc>,
}
