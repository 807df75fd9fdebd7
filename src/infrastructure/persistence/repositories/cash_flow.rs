use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::domain::errors::SentinelResult;
use crate::domain::ledger::{CashFlow, CashFlowType};
use crate::domain::repositories::CashFlowRepository;

pub struct SqliteCashFlowRepository {
    pool: SqlitePool,
}

impl SqliteCashFlowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    transaction_id: String,
    flow_type: String,
    amount: String,
    currency: String,
    amount_eur: String,
    date: String,
    description: String,
}

fn to_domain(row: Row) -> CashFlow {
    CashFlow {
        transaction_id: row.transaction_id,
        flow_type: match row.flow_type.as_str() {
            "WITHDRAWAL" => CashFlowType::Withdrawal,
            "FEE" => CashFlowType::Fee,
            "DIVIDEND" => CashFlowType::Dividend,
            "OTHER" => CashFlowType::Other,
            _ => CashFlowType::Deposit,
        },
        amount: Decimal::from_str(&row.amount).unwrap_or_default(),
        currency: row.currency,
        amount_eur: Decimal::from_str(&row.amount_eur).unwrap_or_default(),
        date: DateTime::parse_from_rfc3339(&row.date)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        description: row.description,
    }
}

#[async_trait]
impl CashFlowRepository for SqliteCashFlowRepository {
    /// `transaction_id` is the broker's idempotency key; re-seeing it during a
    /// sync is a no-op, never a duplicate row (spec §4.6).
    async fn append_if_new(&self, flow: &CashFlow) -> SentinelResult<bool> {
        let flow_type = match flow.flow_type {
            CashFlowType::Deposit => "DEPOSIT",
            CashFlowType::Withdrawal => "WITHDRAWAL",
            CashFlowType::Fee => "FEE",
            CashFlowType::Dividend => "DIVIDEND",
            CashFlowType::Other => "OTHER",
        };
        let result = sqlx::query(
            "INSERT INTO cash_flows (transaction_id, flow_type, amount, currency, amount_eur, date, description) \
             VALUES (?,?,?,?,?,?,?) ON CONFLICT(transaction_id) DO NOTHING",
        )
        .bind(&flow.transaction_id)
        .bind(flow_type)
        .bind(flow.amount.to_string())
        .bind(&flow.currency)
        .bind(flow.amount_eur.to_string())
        .bind(flow.date.to_rfc3339())
        .bind(&flow.description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn all(&self) -> SentinelResult<Vec<CashFlow>> {
        let rows: Vec<Row> = sqlx::query_as(
            "SELECT transaction_id, flow_type, amount, currency, amount_eur, date, description \
             FROM cash_flows ORDER BY date ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_domain).collect())
    }
}
