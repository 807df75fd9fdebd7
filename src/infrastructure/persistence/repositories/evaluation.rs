use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::SentinelResult;
use crate::domain::evaluation::EvaluationResult;
use crate::domain::repositories::EvaluationRepository;

pub struct SqliteEvaluationRepository {
    pool: SqlitePool,
}

impl SqliteEvaluationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    payload: String,
}

#[async_trait]
impl EvaluationRepository for SqliteEvaluationRepository {
    async fn save(&self, result: &EvaluationResult) -> SentinelResult<()> {
        let payload = serde_json::to_string(result)
            .map_err(|e| crate::domain::errors::SentinelError::internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO evaluations (sequence_hash, portfolio_hash, payload, created_at) VALUES (?,?,?,?) \
             ON CONFLICT(sequence_hash, portfolio_hash) DO UPDATE SET payload = excluded.payload",
        )
        .bind(&result.sequence_hash)
        .bind(&result.portfolio_hash)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, sequence_hash: &str, portfolio_hash: &str) -> SentinelResult<Option<EvaluationResult>> {
        let row: Option<Row> = sqlx::query_as(
            "SELECT payload FROM evaluations WHERE sequence_hash = ? AND portfolio_hash = ?",
        )
        .bind(sequence_hash)
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
        let result = sqlx::query("DELETE FROM evaluations").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
