//! `ExchangeCalendar` backed by a fixed local trading-hours table per MIC.
//!
//! Full IANA tz-database handling (DST transitions) is out of scope for
//! this service; each MIC carries a fixed standard-time UTC offset and a
//! 09:30-16:00 local trading window, which is the documented approximation
//! (spec §9 open question: "DST is not modeled, standard-time offsets only").

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::domain::errors::SentinelResult;
use crate::domain::market_hours::Mic;

fn utc_offset_hours(mic: Mic) -> i64 {
    match mic {
        Mic::Xnys | Mic::Xnas | Mic::Xtse => -5,
        Mic::Xetr | Mic::Xpar | Mic::Xams | Mic::Xmil | Mic::Xcse | Mic::Asex => 1,
        Mic::Xlon => 0,
        Mic::Xhkg => 8,
        Mic::Xshg => 8,
        Mic::Xasx => 10,
    }
}

const OPEN_LOCAL: (u32, u32) = (9, 30);
const CLOSE_LOCAL: (u32, u32) = (16, 0);

pub struct FixedHoursCalendar {
    pub holidays: Vec<NaiveDate>,
}

impl FixedHoursCalendar {
    pub fn new() -> Self {
        Self { holidays: Vec::new() }
    }

    fn session_bounds(&self, mic: Mic, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let offset = utc_offset_hours(mic);
        let open_local = NaiveTime::from_hms_opt(OPEN_LOCAL.0, OPEN_LOCAL.1, 0).unwrap();
        let close_local = NaiveTime::from_hms_opt(CLOSE_LOCAL.0, CLOSE_LOCAL.1, 0).unwrap();
        let open = Utc.from_utc_datetime(&date.and_time(open_local)) - Duration::hours(offset);
        let close = Utc.from_utc_datetime(&date.and_time(close_local)) - Duration::hours(offset);
        (open, close)
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

impl Default for FixedHoursCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl crate::domain::ports::ExchangeCalendar for FixedHoursCalendar {
    async fn is_open_at(&self, mic: Mic, at: DateTime<Utc>) -> SentinelResult<bool> {
        let date = at.date_naive();
        if !self.is_trading_day(date) {
            return Ok(false);
        }
        let (open, close) = self.session_bounds(mic, date);
        Ok(at >= open && at < close)
    }

    async fn next_open(&self, mic: Mic, at: DateTime<Utc>) -> SentinelResult<DateTime<Utc>> {
        let mut date = at.date_naive();
        loop {
            if self.is_trading_day(date) {
                let (open, _) = self.session_bounds(mic, date);
                if open > at {
                    return Ok(open);
                }
            }
            date += Duration::days(1);
        }
    }

    async fn next_close(&self, mic: Mic, at: DateTime<Utc>) -> SentinelResult<DateTime<Utc>> {
        let date = at.date_naive();
        if self.is_trading_day(date) {
            let (open, close) = self.session_bounds(mic, date);
            if at >= open && at < close {
                return Ok(close);
            }
        }
        let open = self.next_open(mic, at).await?;
        let (_, close) = self.session_bounds(mic, open.date_naive());
        Ok(close)
    }

    async fn holidays(&self, _mic: Mic, year: i32) -> SentinelResult<Vec<NaiveDate>> {
        Ok(self
            .holidays
            .iter()
            .filter(|d| d.year() == year)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ExchangeCalendar;

    #[tokio::test]
    async fn weekend_is_always_closed() {
        let cal = FixedHoursCalendar::new();
        let saturday = Utc.with_ymd_and_hms(2026, 8, 1, 15, 0, 0).unwrap();
        assert!(!cal.is_open_at(Mic::Xnys, saturday).await.unwrap());
    }

    #[tokio::test]
    async fn within_session_bounds_is_open() {
        let cal = FixedHoursCalendar::new();
        // Monday, NYSE local 10:00 = 15:00 UTC at offset -5.
        let monday_mid_session = Utc.with_ymd_and_hms(2026, 8, 3, 15, 0, 0).unwrap();
        assert!(cal.is_open_at(Mic::Xnys, monday_mid_session).await.unwrap());
    }
}
