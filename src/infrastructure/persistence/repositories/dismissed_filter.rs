use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::SentinelResult;
use crate::domain::ids::Isin;
use crate::domain::repositories::DismissedFilterRepository;

pub struct SqliteDismissedFilterRepository {
    pool: SqlitePool,
}

impl SqliteDismissedFilterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DismissedFilterRepository for SqliteDismissedFilterRepository {
    async fn dismiss(&self, isin: &Isin, calculator: &str, reason: &str) -> SentinelResult<()> {
        sqlx::query(
            "INSERT INTO dismissed_filters (isin, calculator, reason, dismissed_at) VALUES (?,?,?,?) \
             ON CONFLICT(isin, calculator, reason) DO NOTHING",
        )
        .bind(isin.as_str())
        .bind(calculator)
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn undismiss(&self, isin: &Isin, calculator: &str, reason: &str) -> SentinelResult<()> {
        sqlx::query("DELETE FROM dismissed_filters WHERE isin = ? AND calculator = ? AND reason = ?")
            .bind(isin.as_str())
            .bind(calculator)
            .bind(reason)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_dismissed(&self, isin: &Isin, calculator: &str) -> SentinelResult<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM dismissed_filters WHERE isin = ? AND calculator = ?",
        )
        .bind(isin.as_str())
        .bind(calculator)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 > 0)
    }

    async fn clear_for_security(&self, isin: &Isin) -> SentinelResult<u64> {
        let result = sqlx::query("DELETE FROM dismissed_filters WHERE isin = ?")
            .bind(isin.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn all(&self) -> SentinelResult<Vec<(Isin, String, String)>> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT isin, calculator, reason FROM dismissed_filters")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|(isin, calc, reason)| Ok((Isin::parse(&isin)?, calc, reason)))
            .collect()
    }
}
