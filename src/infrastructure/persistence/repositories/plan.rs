use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::SentinelResult;
use crate::domain::evaluation::HolisticPlan;
use crate::domain::repositories::PlanRepository;

pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    payload: String,
}

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn save(&self, plan: &HolisticPlan) -> SentinelResult<()> {
        let payload = serde_json::to_string(plan)
            .map_err(|e| crate::domain::errors::SentinelError::internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO plans (portfolio_hash, sequence_hash, payload, total_score, created_at) \
             VALUES (?,?,?,?,?) \
             ON CONFLICT(portfolio_hash, sequence_hash) DO UPDATE SET payload = excluded.payload, \
             total_score = excluded.total_score",
        )
        .bind(&plan.portfolio_hash)
        .bind(&plan.sequence_hash)
        .bind(payload)
        .bind(plan.score)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn best_for(&self, portfolio_hash: &str) -> SentinelResult<Option<HolisticPlan>> {
        let row: Option<Row> = sqlx::query_as(
            "SELECT payload FROM plans WHERE portfolio_hash = ? ORDER BY total_score DESC LIMIT 1",
        )
        .bind(portfolio_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            serde_json::from_str(&r.payload)
                .map_err(|e| crate::domain::errors::SentinelError::internal(e.to_string()))
        })
        .transpose()
    }

    async fn purge_all(&self) -> SentinelResult<u64> {
        let result = sqlx::query("DELETE FROM plans").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
