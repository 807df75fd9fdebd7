use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::domain::errors::SentinelResult;
use crate::domain::portfolio::CashBalance;
use crate::domain::repositories::CashRepository;

pub struct SqliteCashRepository {
    pool: SqlitePool,
}

impl SqliteCashRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    currency: String,
    amount: String,
}

#[async_trait]
impl CashRepository for SqliteCashRepository {
    async fn replace_all(&self, balances: &[CashBalance]) -> SentinelResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cash_balances").execute(&mut *tx).await?;
        for b in balances {
            sqlx::query("INSERT INTO cash_balances (currency, amount) VALUES (?,?)")
                .bind(&b.currency)
                .bind(b.amount.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn all(&self) -> SentinelResult<Vec<CashBalance>> {
        let rows: Vec<Row> = sqlx::query_as("SELECT currency, amount FROM cash_balances")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| CashBalance {
                currency: r.currency,
                amount: Decimal::from_str(&r.amount).unwrap_or_default(),
            })
            .collect())
    }

    async fn upsert(&self, balance: &CashBalance) -> SentinelResult<()> {
        sqlx::query(
            "INSERT INTO cash_balances (currency, amount) VALUES (?,?) \
             ON CONFLICT(currency) DO UPDATE SET amount = excluded.amount",
        )
        .bind(&balance.currency)
        .bind(balance.amount.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
