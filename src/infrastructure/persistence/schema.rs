//! Schema DDL for each of the seven stores (spec §4.1). Schema discovery is
//! independent of the process working directory: statements live in this
//! binary, not on disk.

pub const UNIVERSE: &str = r#"
CREATE TABLE IF NOT EXISTS securities (
    isin TEXT PRIMARY KEY,
    symbol TEXT NOT NULL,
    name TEXT NOT NULL,
    exchange_code TEXT NOT NULL,
    currency TEXT NOT NULL,
    country TEXT NOT NULL,
    industry TEXT NOT NULL,
    product_type TEXT NOT NULL,
    min_lot TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    allow_buy INTEGER NOT NULL DEFAULT 1,
    allow_sell INTEGER NOT NULL DEFAULT 1,
    tags TEXT NOT NULL DEFAULT '[]',
    last_synced TEXT
);
CREATE TABLE IF NOT EXISTS group_targets (
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    target_weight REAL NOT NULL,
    PRIMARY KEY (kind, name)
);
"#;

pub const CONFIG: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS dismissed_filters (
    isin TEXT NOT NULL,
    calculator TEXT NOT NULL,
    reason TEXT NOT NULL,
    dismissed_at TEXT NOT NULL,
    PRIMARY KEY (isin, calculator, reason)
);
"#;

/// Append-only. No UPDATE or DELETE statement ever targets these tables
/// except the dividend reinvestment flag, which is a same-row status flip.
pub const LEDGER: &str = r#"
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id TEXT NOT NULL UNIQUE,
    isin TEXT NOT NULL,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL,
    quantity TEXT NOT NULL,
    price TEXT NOT NULL,
    currency TEXT NOT NULL,
    currency_rate TEXT NOT NULL,
    value_eur TEXT NOT NULL,
    executed_at TEXT NOT NULL,
    source TEXT NOT NULL,
    mode TEXT NOT NULL,
    bucket_id TEXT
);
CREATE TABLE IF NOT EXISTS cash_flows (
    transaction_id TEXT PRIMARY KEY,
    flow_type TEXT NOT NULL,
    amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    amount_eur TEXT NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS dividends (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    isin TEXT NOT NULL,
    cash_flow_transaction_id TEXT,
    reinvested INTEGER NOT NULL DEFAULT 0,
    reinvested_quantity TEXT,
    pending_bonus TEXT NOT NULL,
    bonus_cleared INTEGER NOT NULL DEFAULT 0
);
"#;

pub const PORTFOLIO: &str = r#"
CREATE TABLE IF NOT EXISTS positions (
    isin TEXT PRIMARY KEY,
    quantity TEXT NOT NULL,
    avg_cost TEXT NOT NULL,
    market_price TEXT NOT NULL,
    market_value_eur TEXT NOT NULL,
    last_update TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS cash_balances (
    currency TEXT PRIMARY KEY,
    amount TEXT NOT NULL
);
"#;

pub const HISTORY: &str = r#"
CREATE TABLE IF NOT EXISTS price_bars (
    isin TEXT NOT NULL,
    date TEXT NOT NULL,
    open TEXT NOT NULL,
    high TEXT NOT NULL,
    low TEXT NOT NULL,
    close TEXT NOT NULL,
    adjusted_close TEXT NOT NULL,
    volume INTEGER NOT NULL,
    PRIMARY KEY (isin, date)
);
CREATE TABLE IF NOT EXISTS fx_rates (
    from_currency TEXT NOT NULL,
    to_currency TEXT NOT NULL,
    date TEXT NOT NULL,
    rate TEXT NOT NULL,
    PRIMARY KEY (from_currency, to_currency, date)
);
"#;

/// Ephemeral planning artifacts. Purged wholesale on universe invalidation
/// (spec §4.10) so nothing here is treated as durable.
pub const CACHE: &str = r#"
CREATE TABLE IF NOT EXISTS sequences (
    sequence_hash TEXT PRIMARY KEY,
    portfolio_hash TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS evaluations (
    sequence_hash TEXT NOT NULL,
    portfolio_hash TEXT NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (sequence_hash, portfolio_hash)
);
CREATE TABLE IF NOT EXISTS plans (
    portfolio_hash TEXT NOT NULL,
    sequence_hash TEXT NOT NULL,
    payload TEXT NOT NULL,
    total_score REAL NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (portfolio_hash, sequence_hash)
);
"#;

pub const CLIENT_DATA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    scheduled_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT,
    retries INTEGER NOT NULL DEFAULT 0,
    error TEXT
);
CREATE TABLE IF NOT EXISTS events_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    payload TEXT NOT NULL,
    occurred_at TEXT NOT NULL
);
"#;
