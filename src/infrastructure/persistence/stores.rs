//! Opens and migrates all seven stores behind one handle (spec §4.1, C1).
//!
//! Grounded on the teacher's `Database::init`, generalized from a single
//! file to a directory of named files, each with its own profile.

use std::path::{Path, PathBuf};

use crate::domain::errors::SentinelResult;

use super::schema;
use super::store::{Store, StoreProfile};

#[derive(Clone)]
pub struct StorageSubstrate {
    pub universe: Store,
    pub config: Store,
    pub ledger: Store,
    pub portfolio: Store,
    pub history: Store,
    pub cache: Store,
    pub client_data: Store,
}

impl StorageSubstrate {
    /// `data_dir` is resolved by the caller (config layer), so schema
    /// discovery never depends on the process's current working directory.
    pub async fn open(data_dir: &Path) -> SentinelResult<Self> {
        let path = |name: &str| -> PathBuf { data_dir.join(format!("{name}.db")) };

        let universe = Store::open(&path("universe"), StoreProfile::Standard, "universe").await?;
        universe.migrate(schema::UNIVERSE).await?;

        let config = Store::open(&path("config"), StoreProfile::Standard, "config").await?;
        config.migrate(schema::CONFIG).await?;

        let ledger = Store::open(&path("ledger"), StoreProfile::MaximumSafety, "ledger").await?;
        ledger.migrate(schema::LEDGER).await?;

        let portfolio = Store::open(&path("portfolio"), StoreProfile::Standard, "portfolio").await?;
        portfolio.migrate(schema::PORTFOLIO).await?;

        let history = Store::open(&path("history"), StoreProfile::Standard, "history").await?;
        history.migrate(schema::HISTORY).await?;

        let cache = Store::open(&path("cache"), StoreProfile::Speed, "cache").await?;
        cache.migrate(schema::CACHE).await?;

        let client_data = Store::open(&path("client_data"), StoreProfile::Speed, "client_data").await?;
        client_data.migrate(schema::CLIENT_DATA).await?;

        Ok(Self {
            universe,
            config,
            ledger,
            portfolio,
            history,
            cache,
            client_data,
        })
    }

    pub fn all(&self) -> Vec<&Store> {
        vec![
            &self.universe,
            &self.config,
            &self.ledger,
            &self.portfolio,
            &self.history,
            &self.cache,
            &self.client_data,
        ]
    }

    /// Ledger failing integrity is unrecoverable without manual intervention
    /// (spec §6, exit code 1); the rest degrade to a `DependencyDown` read.
    pub async fn health_check_all(&self) -> SentinelResult<()> {
        for store in self.all() {
            store.quick_check().await?;
        }
        Ok(())
    }

    /// Clears every row in the cache store in one transaction (spec §4.10:
    /// the universe invalidator is "the sole authorized path for clearing
    /// planning caches across portfolios").
    pub async fn purge_cache(&self) -> SentinelResult<()> {
        self.cache
            .with_transaction(|mut tx| async move {
                sqlx::query("DELETE FROM sequences").execute(&mut *tx).await?;
                sqlx::query("DELETE FROM evaluations").execute(&mut *tx).await?;
                sqlx::query("DELETE FROM plans").execute(&mut *tx).await?;
                Ok((tx, ()))
            })
            .await
    }
}
