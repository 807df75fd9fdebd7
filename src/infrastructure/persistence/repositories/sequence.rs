use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::SentinelResult;
use crate::domain::hash::{sequence_hash, CanonicalAction};
use crate::domain::opportunity::ActionSequence;
use crate::domain::repositories::SequenceRepository;

pub struct SqliteSequenceRepository {
    pool: SqlitePool,
}

impl SqliteSequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SequenceRepository for SqliteSequenceRepository {
    async fn save(&self, portfolio_hash: &str, sequence: &ActionSequence) -> SentinelResult<String> {
        let actions: Vec<CanonicalAction> = sequence
            .steps
            .iter()
            .map(|s| CanonicalAction {
                isin: s.isin.clone(),
                side: s.side,
                quantity: s.quantity,
            })
            .collect();
        let hash = sequence_hash(&actions);
        let payload = serde_json::to_string(sequence)
            .map_err(|e| crate::domain::errors::SentinelError::internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO sequences (sequence_hash, portfolio_hash, payload, created_at) VALUES (?,?,?,?) \
             ON CONFLICT(sequence_hash) DO NOTHING",
        )
        .bind(&hash)
        .bind(portfolio_hash)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(hash)
    }

    async fn purge_all(&self) -> SentinelResult<u64> {
        let result = sqlx::query("DELETE FROM sequences").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
