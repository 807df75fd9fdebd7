//! A single SQLite-backed store: connection pool, PRAGMA profile, scoped
//! transactions, health checks, WAL checkpointing and vacuum (spec §4.1).
//!
//! Grounded on the teacher's `Database` wrapper (`SqlitePool` + `init()`),
//! generalized from one hard-coded schema to a named, profiled store whose
//! schema is supplied by the caller.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::Duration;

use futures::FutureExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tokio::fs;
use tracing::{info, warn};

use crate::domain::errors::{ErrorKind, SentinelError, SentinelResult};

/// Per-store safety/performance profile (spec §4.1 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreProfile {
    /// fsync every write, never auto-shrink (ledger).
    MaximumSafety,
    /// Balanced durability for mutable stores.
    Standard,
    /// No fsync, auto-reclaim, ephemeral data (cache, client_data).
    Speed,
}

impl StoreProfile {
    fn synchronous(&self) -> SqliteSynchronous {
        match self {
            StoreProfile::MaximumSafety => SqliteSynchronous::Full,
            StoreProfile::Standard => SqliteSynchronous::Normal,
            StoreProfile::Speed => SqliteSynchronous::Off,
        }
    }

    fn pool_sizing(&self) -> (u32, u32) {
        // (max_connections, min_connections/idle)
        match self {
            StoreProfile::Speed => (10, 2),
            _ => (25, 5),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub size_mb: f64,
    pub wal_mb: f64,
    pub page_count: i64,
    pub freelist: i64,
}

/// One of the seven purpose-partitioned databases.
#[derive(Clone)]
pub struct Store {
    pub name: &'static str,
    pub profile: StoreProfile,
    pub pool: SqlitePool,
}

impl Store {
    pub async fn open(path: &Path, profile: StoreProfile, name: &'static str) -> SentinelResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| SentinelError::internal(format!("create data dir: {e}")))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(profile.synchronous())
            .foreign_keys(true)
            .pragma("cache_size", "-65536") // 64 MB page cache
            .pragma("temp_store", "memory")
            .pragma("wal_autocheckpoint", "1000");

        let (max_conn, min_conn) = profile.pool_sizing();
        let pool = SqlitePoolOptions::new()
            .max_connections(max_conn)
            .min_connections(min_conn)
            .max_lifetime(Some(Duration::from_secs(24 * 3600)))
            .idle_timeout(Some(Duration::from_secs(30 * 60)))
            .connect_with(options)
            .await
            .map_err(|e| SentinelError::internal(format!("connect {name}: {e}")))?;

        info!(store = name, "opened store");
        Ok(Self { name, profile, pool })
    }

    /// Apply a schema (idempotent `CREATE TABLE IF NOT EXISTS` statements).
    pub async fn migrate(&self, schema_sql: &str) -> SentinelResult<()> {
        for statement in schema_sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| SentinelError::internal(format!("migrate {}: {e}", self.name)))?;
        }
        Ok(())
    }

    /// Begins a transaction, runs `f`, commits on success, rolls back on
    /// error, and converts a panic inside `f` into a classified error with
    /// rollback rather than propagating the unwind (spec §4.1, §7).
    pub async fn with_transaction<'a, T, F, Fut>(&'a self, f: F) -> SentinelResult<T>
    where
        F: FnOnce(sqlx::Transaction<'a, sqlx::Sqlite>) -> Fut + Send,
        Fut: Future<Output = SentinelResult<(sqlx::Transaction<'a, sqlx::Sqlite>, T)>> + Send,
        T: Send,
    {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SentinelError::internal(format!("begin tx on {}: {e}", self.name)))?;

        let outcome = AssertUnwindSafe(f(tx)).catch_unwind().await;

        match outcome {
            Ok(Ok((tx, value))) => {
                tx.commit()
                    .await
                    .map_err(|e| SentinelError::internal(format!("commit on {}: {e}", self.name)))?;
                Ok(value)
            }
            Ok(Err(err)) => Err(err),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(store = self.name, %message, "transaction panicked, rolled back");
                Err(SentinelError::new(
                    ErrorKind::Internal,
                    format!("transaction on {} panicked: {message}", self.name),
                ))
            }
        }
    }

    pub async fn health_check(&self) -> SentinelResult<()> {
        let row: (String,) = sqlx::query_as("PRAGMA integrity_check")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SentinelError::new(ErrorKind::DependencyDown, e.to_string()))?;
        if row.0 != "ok" {
            return Err(SentinelError::corrupt(format!(
                "integrity_check on {}: {}",
                self.name, row.0
            )));
        }
        Ok(())
    }

    pub async fn quick_check(&self) -> SentinelResult<()> {
        let row: (String,) = sqlx::query_as("PRAGMA quick_check")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SentinelError::new(ErrorKind::DependencyDown, e.to_string()))?;
        if row.0 != "ok" {
            return Err(SentinelError::corrupt(format!("quick_check on {}: {}", self.name, row.0)));
        }
        Ok(())
    }

    pub async fn wal_checkpoint_truncate(&self) -> SentinelResult<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .map_err(|e| SentinelError::internal(e.to_string()))?;
        Ok(())
    }

    pub async fn vacuum(&self) -> SentinelResult<()> {
        if self.name == "ledger" {
            return Err(SentinelError::validation("ledger is append-only and is never vacuumed"));
        }
        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(|e| SentinelError::internal(e.to_string()))?;
        Ok(())
    }

    pub async fn stats(&self) -> SentinelResult<StoreStats> {
        let (page_count,): (i64,) = sqlx::query_as("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SentinelError::internal(e.to_string()))?;
        let (page_size,): (i64,) = sqlx::query_as("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SentinelError::internal(e.to_string()))?;
        let (freelist,): (i64,) = sqlx::query_as("PRAGMA freelist_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SentinelError::internal(e.to_string()))?;

        let size_mb = (page_count * page_size) as f64 / (1024.0 * 1024.0);
        Ok(StoreStats {
            size_mb,
            wal_mb: 0.0,
            page_count,
            freelist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ledger_profile_refuses_vacuum() {
        let tmp = tempdir();
        let store = Store::open(&tmp.join("ledger.db"), StoreProfile::MaximumSafety, "ledger")
            .await
            .unwrap();
        store.migrate("CREATE TABLE IF NOT EXISTS t(id INTEGER)").await.unwrap();
        assert!(store.vacuum().await.is_err());
    }

    #[tokio::test]
    async fn transaction_commits_on_success_and_rolls_back_on_error() {
        let tmp = tempdir();
        let store = Store::open(&tmp.join("cache.db"), StoreProfile::Speed, "cache")
            .await
            .unwrap();
        store
            .migrate("CREATE TABLE IF NOT EXISTS t(v INTEGER)")
            .await
            .unwrap();

        store
            .with_transaction(|mut tx| async move {
                sqlx::query("INSERT INTO t(v) VALUES (1)")
                    .execute(&mut *tx)
                    .await
                    .unwrap();
                Ok((tx, ()))
            })
            .await
            .unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);

        let result: SentinelResult<()> = store
            .with_transaction(|mut tx| async move {
                sqlx::query("INSERT INTO t(v) VALUES (2)")
                    .execute(&mut *tx)
                    .await
                    .unwrap();
                Err(SentinelError::validation("rollback me"))
            })
            .await;
        assert!(result.is_err());

        let count_after: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count_after.0, 1, "failed transaction must not persist");
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("sentinel-test-{}", uuid::Uuid::new_v4()));
        dir
    }
}
