use async_trait::async_trait;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::domain::errors::SentinelResult;
use crate::domain::repositories::GroupTargetRepository;
use crate::domain::security::{GroupKind, GroupTarget};

pub struct SqliteGroupTargetRepository {
    pool: SqlitePool,
}

impl SqliteGroupTargetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    kind: String,
    name: String,
    target_weight: f64,
}

#[async_trait]
impl GroupTargetRepository for SqliteGroupTargetRepository {
    async fn upsert(&self, target: &GroupTarget) -> SentinelResult<()> {
        sqlx::query(
            "INSERT INTO group_targets (kind, name, target_weight) VALUES (?,?,?) \
             ON CONFLICT(kind, name) DO UPDATE SET target_weight = excluded.target_weight",
        )
        .bind(target.kind.as_str())
        .bind(&target.name)
        .bind(target.target_weight)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, kind: &str, name: &str) -> SentinelResult<()> {
        sqlx::query("DELETE FROM group_targets WHERE kind = ? AND name = ?")
            .bind(kind)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn all(&self) -> SentinelResult<Vec<GroupTarget>> {
        let rows: Vec<Row> = sqlx::query_as("SELECT kind, name, target_weight FROM group_targets")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|r| {
                Ok(GroupTarget {
                    kind: GroupKind::from_str(&r.kind)?,
                    name: r.name,
                    target_weight: r.target_weight,
                })
            })
            .collect()
    }
}
