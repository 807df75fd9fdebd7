use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::SentinelResult;
use crate::domain::job::{Job, JobStatus};
use crate::domain::repositories::JobRepository;

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    name: String,
    status: String,
    scheduled_at: String,
    started_at: Option<String>,
    finished_at: Option<String>,
    retries: i64,
    error: Option<String>,
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn to_domain(row: Row) -> Job {
    Job {
        id: row.id,
        name: row.name,
        scheduled_at: parse_dt(&row.scheduled_at),
        started_at: row.started_at.as_deref().map(parse_dt),
        finished_at: row.finished_at.as_deref().map(parse_dt),
        status: match row.status.as_str() {
            "running" => JobStatus::Running,
            "ok" => JobStatus::Ok,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Queued,
        },
        retries: row.retries.max(0) as u32,
        last_error: row.error,
    }
}

const SELECT: &str =
    "SELECT id, name, status, scheduled_at, started_at, finished_at, retries, error FROM jobs";

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert_queued(&self, name: &str, scheduled_at: DateTime<Utc>) -> SentinelResult<Job> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO jobs (name, status, priority, scheduled_at, retries) \
             VALUES (?, 'queued', 'normal', ?, 0) RETURNING id",
        )
        .bind(name)
        .bind(scheduled_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(Job {
            id,
            name: name.to_string(),
            scheduled_at,
            started_at: None,
            finished_at: None,
            status: JobStatus::Queued,
            retries: 0,
            last_error: None,
        })
    }

    /// Backs the scheduler's per-job-name coalescing lock (spec §4.3).
    async fn has_in_flight(&self, name: &str) -> SentinelResult<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE name = ? AND status IN ('queued', 'running')",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0 > 0)
    }

    async fn mark_running(&self, id: i64) -> SentinelResult<()> {
        sqlx::query("UPDATE jobs SET status = 'running', started_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_finished(&self, id: i64, ok: bool, error: Option<String>) -> SentinelResult<()> {
        sqlx::query("UPDATE jobs SET status = ?, finished_at = ?, error = ? WHERE id = ?")
            .bind(if ok { "ok" } else { "failed" })
            .bind(Utc::now().to_rfc3339())
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_retry(&self, id: i64) -> SentinelResult<u32> {
        sqlx::query("UPDATE jobs SET retries = retries + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let row: (i64,) = sqlx::query_as("SELECT retries FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0.max(0) as u32)
    }

    async fn recent(&self, limit: usize) -> SentinelResult<Vec<Job>> {
        let rows: Vec<Row> = sqlx::query_as(&format!(
            "{SELECT} ORDER BY scheduled_at DESC LIMIT {}",
            limit as i64
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_domain).collect())
    }
}
