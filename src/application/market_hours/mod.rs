//! C5: market hours service (spec §4.5). Wraps `ExchangeCalendar` with the
//! status/validation DTOs the trading pipeline and HTTP facade consume.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::errors::SentinelResult;
use crate::domain::market_hours::{MarketStatus, Mic, TradingWindowValidation};
use crate::domain::ports::ExchangeCalendar;

pub struct MarketHoursService {
    calendar: Arc<dyn ExchangeCalendar>,
}

impl MarketHoursService {
    pub fn new(calendar: Arc<dyn ExchangeCalendar>) -> Self {
        Self { calendar }
    }

    pub async fn status(&self, mic: Mic) -> SentinelResult<MarketStatus> {
        let now = Utc::now();
        let open = self.calendar.is_open_at(mic, now).await?;
        let (opens_at, closes_at) = if open {
            (None, Some(self.calendar.next_close(mic, now).await?))
        } else {
            (Some(self.calendar.next_open(mic, now).await?), None)
        };

        Ok(MarketStatus {
            mic: mic.code().to_string(),
            open,
            timezone: mic.timezone().to_string(),
            opens_at,
            closes_at,
            opens_date: opens_at.map(|dt| dt.date_naive()),
        })
    }

    pub async fn statuses(&self, mics: &[Mic]) -> SentinelResult<Vec<MarketStatus>> {
        let mut out = Vec::with_capacity(mics.len());
        for mic in mics {
            out.push(self.status(*mic).await?);
        }
        Ok(out)
    }

    /// Used by the trade validation pipeline's market-hours layer (spec
    /// §4.9). `requires_market_hours` lets research-mode trades bypass the
    /// check entirely.
    pub async fn validate_window(&self, mic: Mic, requires_market_hours: bool) -> SentinelResult<TradingWindowValidation> {
        let market_open = self.calendar.is_open_at(mic, Utc::now()).await?;
        Ok(TradingWindowValidation {
            can_trade: !requires_market_hours || market_open,
            market_open,
            requires_market_hours,
            checked_at: Utc::now(),
        })
    }
}
