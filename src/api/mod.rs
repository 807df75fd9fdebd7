//! HTTP surface (spec §6): one `axum::Router<Arc<Container>>` nesting every
//! endpoint family under its documented prefix. Every handler takes the
//! shared `Container` as Axum state; `error::ApiError` is the single place
//! responses get mapped onto status codes.

pub mod allocation;
pub mod currency;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod historical;
pub mod planning;
pub mod rebalancing;
pub mod risk;
pub mod scoring;
pub mod system;
pub mod trading;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::container::Container;

pub fn router(container: Arc<Container>) -> Router {
    let system = Router::new()
        .route("/version", get(system::version))
        .route("/system/status", get(system::status))
        .route("/system/jobs", get(system::jobs))
        .route("/system/jobs/:name", post(system::trigger_job))
        .route("/system/database/stats", get(system::database_stats))
        .route("/system/disk", get(system::disk))
        .route("/system/markets", get(system::markets))
        .route("/system/tradernet", get(system::tradernet))
        .route("/system/sync/:kind", post(system::trigger_sync));

    let allocation = Router::new()
        .route("/allocation/current", get(allocation::current))
        .route("/allocation/groups/:kind", get(allocation::group_by_kind))
        .route("/allocation/targets", get(allocation::targets))
        .route("/allocation/vs-targets", get(allocation::vs_targets))
        .route("/allocation/deviations", get(allocation::deviations))
        .route("/allocation/groups/targets/:kind", put(allocation::put_group_target))
        .route("/allocation/groups/:kind/:name", delete(allocation::delete_group_target));

    let trading = Router::new()
        .route("/trades", get(trading::list))
        .route("/trades/execute", post(trading::execute))
        .route("/trade-validation/validate-trade", post(trading::validate_trade))
        .route("/trade-validation/check-eligibility", post(trading::check_eligibility))
        .route("/trade-validation/check-cash-sufficiency", post(trading::check_cash_sufficiency))
        .route("/trade-validation/calculate-commission", post(trading::calculate_commission))
        .route("/trade-validation/calculate-limit-price", post(trading::calculate_limit_price));

    let planning = Router::new()
        .route("/planning/config", get(planning::get_config).put(planning::put_config))
        .route("/planning/config/validate", post(planning::validate_config))
        .route("/planning/status", get(planning::status))
        .route("/planning/recommendations", get(planning::recommendations).post(planning::trigger_recommendations))
        .route("/planning/batch", post(planning::batch))
        .route("/planning/execute", post(planning::execute))
        .route("/planning/stream", get(planning::stream));

    let evaluation = Router::new()
        .route("/v1/evaluate/single", post(evaluation::evaluate_single))
        .route("/v1/evaluate/batch", post(evaluation::evaluate_batch))
        .route("/v1/evaluate/compare", post(evaluation::compare))
        .route("/v1/evaluate/stochastic", post(evaluation::evaluate_stochastic))
        .route("/v1/evaluate/monte-carlo", post(evaluation::monte_carlo))
        .route("/v1/monte-carlo/advanced", post(evaluation::monte_carlo_advanced))
        .route("/v1/simulate/batch", post(evaluation::simulate_batch))
        .route("/v1/simulate/custom-prices", post(evaluation::simulate_custom_prices))
        .route("/v1/evaluation/criteria", get(evaluation::criteria));

    let rebalancing = Router::new()
        .route("/rebalancing/triggers", get(rebalancing::triggers))
        .route("/rebalancing/min-trade-amount", get(rebalancing::min_trade_amount))
        .route("/rebalancing/calculate", post(rebalancing::calculate))
        .route("/rebalancing/calculate/target-weights", post(rebalancing::calculate_target_weights))
        .route("/rebalancing/simulate-rebalance", post(rebalancing::simulate_rebalance))
        .route("/rebalancing/negative-balance-check", post(rebalancing::negative_balance_check));

    let currency = Router::new()
        .route("/currency/balances", get(currency::balances))
        .route("/currency/available-currencies", get(currency::available_currencies))
        .route("/currency/conversion-path/:from/:to", get(currency::conversion_path))
        .route("/currency/rates/fallback-chain/:from/:to", get(currency::rates_fallback_chain))
        .route("/currency/rates/sources", get(currency::rates_sources))
        .route("/currency/rates/staleness/:from/:to", get(currency::rates_staleness))
        .route("/currency/balance-check", post(currency::balance_check))
        .route("/currency/conversion-requirements", post(currency::conversion_requirements))
        .route("/currency/convert", post(currency::convert))
        .route("/currency/rates/sync", post(currency::sync_rates));

    let historical = Router::new()
        .route("/historical/prices/:isin", get(historical::prices))
        .route("/historical/returns/:isin", get(historical::returns))
        .route("/historical/exchange-rates/:from/:to", get(historical::exchange_rates));

    let risk = Router::new()
        .route("/risk/portfolio", get(risk::portfolio_metrics))
        .route("/risk/portfolio/:metric", get(risk::portfolio_metric))
        .route("/risk/securities/:isin", get(risk::security_metrics))
        .route("/risk/securities/:isin/:metric", get(risk::security_metric))
        .route("/risk/kelly-sizes", get(risk::kelly_sizes))
        .route("/risk/kelly-sizes/:isin", get(risk::kelly_size));

    let scoring = Router::new()
        .route("/scoring/components/all", get(scoring::components_all))
        .route("/scoring/components/:isin", get(scoring::components_for))
        .route("/scoring/formulas/active", get(scoring::formulas_active))
        .route("/scoring/weights/current", get(scoring::weights_current))
        .route("/scoring/weights/adaptive-history", get(scoring::weights_adaptive_history))
        .route("/scoring/score/what-if", post(scoring::score_what_if))
        .route("/scoring/score/:isin", post(scoring::score));

    let events = Router::new().route("/events/stream", get(events::stream));

    let api = Router::new()
        .merge(system)
        .merge(allocation)
        .merge(trading)
        .merge(planning)
        .merge(evaluation)
        .merge(rebalancing)
        .merge(currency)
        .merge(historical)
        .merge(risk)
        .merge(scoring)
        .merge(events);

    Router::new()
        .route("/health", get(system::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive().max_age(Duration::from_secs(3600)))
        .with_state(container)
}
