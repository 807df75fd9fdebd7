//! Job scheduler configuration parsing from environment variables (spec §4.3).

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SchedulerEnvConfig {
    pub max_concurrent_jobs: usize,
    pub backoff_base: Duration,
    pub max_retries: u32,
}

impl Default for SchedulerEnvConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            backoff_base: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

impl SchedulerEnvConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let default = Self::default();

        let max_concurrent_jobs = match env::var("SENTINEL_SCHEDULER_CONCURRENCY") {
            Ok(v) => v
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("invalid SENTINEL_SCHEDULER_CONCURRENCY: {e}"))?,
            Err(_) => default.max_concurrent_jobs,
        };
        let backoff_secs = match env::var("SENTINEL_SCHEDULER_BACKOFF_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("invalid SENTINEL_SCHEDULER_BACKOFF_SECS: {e}"))?,
            Err(_) => default.backoff_base.as_secs(),
        };
        let max_retries = match env::var("SENTINEL_SCHEDULER_MAX_RETRIES") {
            Ok(v) => v
                .parse::<u32>()
                .map_err(|e| anyhow::anyhow!("invalid SENTINEL_SCHEDULER_MAX_RETRIES: {e}"))?,
            Err(_) => default.max_retries,
        };

        Ok(Self {
            max_concurrent_jobs,
            backoff_base: Duration::from_secs(backoff_secs),
            max_retries,
        })
    }
}
