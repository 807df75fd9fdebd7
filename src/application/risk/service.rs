//! C-risk: read-only risk/analytics projections over historical prices
//! (spec §4 `/api/risk/...`, `/kelly-sizes`). Fixed 252 trading-day period
//! per spec §9 (not runtime-configurable — the spec leaves this open and we
//! pin it to the conventional annualization constant).
//!
//! Grounded on the teacher's own statrs usage (z-score mean reversion) and
//! the backtesting example's `Statistics`/`OrderStatistics` pattern for
//! Sharpe/Sortino/VaR/CVaR.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::{Data, Distribution, OrderStatistics, Statistics};

use crate::domain::errors::SentinelResult;
use crate::domain::ids::Isin;
use crate::domain::repositories::PriceBarRepository;
use crate::domain::risk::{KellySize, RiskMetrics};
use crate::domain::portfolio::PortfolioSnapshot;

const TRADING_DAYS: f64 = 252.0;
const LOOKBACK_DAYS: i64 = 400;
const VAR_PERCENTILE: usize = 5;

pub struct RiskService {
    price_bars: Arc<dyn PriceBarRepository>,
    risk_free_rate: f64,
}

impl RiskService {
    pub fn new(price_bars: Arc<dyn PriceBarRepository>, risk_free_rate: f64) -> Self {
        Self {
            price_bars,
            risk_free_rate,
        }
    }

    /// Computes risk metrics for a single security from its adjusted close
    /// history (spec §4 `/api/risk/securities/{isin}/...`).
    pub async fn security_metrics(&self, isin: &Isin) -> SentinelResult<Option<RiskMetrics>> {
        let today = Utc::now().date_naive();
        let from = today - chrono::Duration::days(LOOKBACK_DAYS);
        let bars = self.price_bars.range(isin, from, today).await?;
        Ok(returns_from_bars(&bars).map(|r| metrics_from_returns(&r, self.risk_free_rate)))
    }

    /// Approximates portfolio-level risk as the value-weighted average of
    /// each held position's own return series (spec §1: "read-only
    /// projections over the data model", not a covariance-aware model).
    pub async fn portfolio_metrics(&self, snapshot: &PortfolioSnapshot) -> SentinelResult<Option<RiskMetrics>> {
        let today = Utc::now().date_naive();
        let from = today - chrono::Duration::days(LOOKBACK_DAYS);
        let total_value = snapshot.total_value_eur();
        if total_value.is_zero() {
            return Ok(None);
        }

        let mut weighted: Option<Vec<f64>> = None;
        for position in snapshot.current_positions() {
            let weight = (position.market_value_eur / total_value).to_f64().unwrap_or(0.0);
            if weight <= 0.0 {
                continue;
            }
            let bars = self.price_bars.range(&position.isin, from, today).await?;
            let Some(returns) = returns_from_bars(&bars) else {
                continue;
            };
            accumulate_weighted(&mut weighted, &returns, weight);
        }

        Ok(weighted.map(|r| metrics_from_returns(&r, self.risk_free_rate)))
    }

    /// Per-security Kelly fraction `f* = mean(returns) / variance(returns)`,
    /// clamped to `[0, 1]` since short positions are out of scope (spec §4
    /// `/kelly-sizes`).
    pub async fn kelly_size(&self, isin: &Isin) -> SentinelResult<Option<KellySize>> {
        let today = Utc::now().date_naive();
        let from = today - chrono::Duration::days(LOOKBACK_DAYS);
        let bars = self.price_bars.range(isin, from, today).await?;
        let Some(returns) = returns_from_bars(&bars) else {
            return Ok(None);
        };
        let data = Data::new(returns);
        let mean = data.mean().unwrap_or(0.0);
        let variance = data.variance().unwrap_or(0.0);
        let fraction = if variance > 0.0 { (mean / variance).clamp(0.0, 1.0) } else { 0.0 };
        Ok(Some(KellySize {
            isin: isin.to_string(),
            fraction,
        }))
    }
}

fn returns_from_bars(bars: &[crate::domain::history::PriceBar]) -> Option<Vec<f64>> {
    if bars.len() < 2 {
        return None;
    }
    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|b| b.date);
    let closes: Vec<f64> = sorted.iter().filter_map(|b| b.adjusted_close.to_f64()).collect();
    if closes.len() < 2 {
        return None;
    }
    Some(
        closes
            .windows(2)
            .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
            .collect(),
    )
}

fn accumulate_weighted(weighted: &mut Option<Vec<f64>>, returns: &[f64], weight: f64) {
    match weighted {
        None => *weighted = Some(returns.iter().map(|r| r * weight).collect()),
        Some(acc) => {
            let len = acc.len().min(returns.len());
            acc.truncate(len);
            for (a, r) in acc.iter_mut().zip(returns) {
                *a += r * weight;
            }
        }
    }
}

fn metrics_from_returns(returns: &[f64], risk_free_rate: f64) -> RiskMetrics {
    let daily_rf = risk_free_rate / TRADING_DAYS;
    let mean_return = (&returns[..]).mean();
    let volatility = (&returns[..]).std_dev();

    let mut data = Data::new(returns.to_vec());
    let value_at_risk = data.percentile(VAR_PERCENTILE);
    let tail: Vec<f64> = returns.iter().filter(|&&r| r <= value_at_risk).copied().collect();
    let conditional_value_at_risk = if tail.is_empty() { value_at_risk } else { (&tail[..]).mean() };

    let sharpe_ratio = if volatility > 0.0 {
        (mean_return - daily_rf) / volatility * TRADING_DAYS.sqrt()
    } else {
        0.0
    };
    let sortino_ratio = sortino(returns, daily_rf);
    let max_drawdown = max_drawdown_from_returns(returns);

    RiskMetrics {
        annualized_return: mean_return * TRADING_DAYS,
        volatility: volatility * TRADING_DAYS.sqrt(),
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        value_at_risk,
        conditional_value_at_risk,
        sample_size: returns.len(),
    }
}

fn sortino(returns: &[f64], daily_rf: f64) -> f64 {
    let downside: Vec<f64> = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .collect();
    if downside.is_empty() {
        return 0.0;
    }
    let downside_deviation = (&downside[..]).mean().sqrt();
    if downside_deviation <= 0.0 {
        return 0.0;
    }
    let mean_return = (&returns[..]).mean();
    (mean_return - daily_rf) / downside_deviation * TRADING_DAYS.sqrt()
}

fn max_drawdown_from_returns(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut max_dd = 0.0;
    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        }
        let dd = (peak - equity) / peak;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_drawdown_flat_series_is_zero() {
        assert_eq!(max_drawdown_from_returns(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn max_drawdown_detects_decline() {
        let dd = max_drawdown_from_returns(&[0.1, -0.2, -0.1]);
        assert!(dd > 0.0);
    }
}
