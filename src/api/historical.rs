//! `/api/historical/*` (spec §6 "Historical data" family) — direct reads
//! over the history store's price bars and FX rates.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::container::Container;
use crate::domain::ids::Isin;

use super::error::ApiResult;

const DEFAULT_LOOKBACK_DAYS: i64 = 365;

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn resolve_range(query: &RangeQuery) -> (NaiveDate, NaiveDate) {
    let to = query.to.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let from = query.from.unwrap_or(to - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS));
    (from, to)
}

pub async fn prices(
    State(container): State<Arc<Container>>,
    Path(isin): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&isin)?;
    let (from, to) = resolve_range(&query);
    let bars = container.price_bars.range(&isin, from, to).await?;
    Ok(Json(json!({"isin": isin, "from": from, "to": to, "bars": bars})))
}

pub async fn returns(
    State(container): State<Arc<Container>>,
    Path(isin): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Value>> {
    let isin = Isin::parse(&isin)?;
    let (from, to) = resolve_range(&query);
    let mut bars = container.price_bars.range(&isin, from, to).await?;
    bars.sort_by_key(|b| b.date);
    let returns: Vec<Value> = bars
        .windows(2)
        .map(|w| {
            let prev = w[0].adjusted_close;
            let curr = w[1].adjusted_close;
            let pct = if prev.is_zero() {
                rust_decimal::Decimal::ZERO
            } else {
                (curr - prev) / prev
            };
            json!({"date": w[1].date, "return": pct})
        })
        .collect();
    Ok(Json(json!({"isin": isin, "returns": returns})))
}

pub async fn exchange_rates(
    State(container): State<Arc<Container>>,
    Path((from, to)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let rate = container.fx_rates.latest(&from, &to).await?;
    Ok(Json(json!({"from": from, "to": to, "rate": rate})))
}
