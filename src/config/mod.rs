//! Environment-sourced configuration, composed from per-concern sub-configs
//! the way the teacher splits `BrokerEnvConfig`/`RiskEnvConfig`/
//! `StrategyEnvConfig` (spec §1 ambient Configuration section).

pub mod broker_config;
pub mod http_config;
pub mod planner_config;
pub mod scheduler_config;
pub mod storage_config;

pub use broker_config::BrokerEnvConfig;
pub use http_config::HttpEnvConfig;
pub use planner_config::PlannerEnvConfig;
pub use scheduler_config::SchedulerEnvConfig;
pub use storage_config::StorageEnvConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageEnvConfig,
    pub http: HttpEnvConfig,
    pub broker: BrokerEnvConfig,
    pub planner: PlannerEnvConfig,
    pub scheduler: SchedulerEnvConfig,
}

impl Config {
    /// Loads `.env` if present, then reads every sub-config from the
    /// process environment. A parse failure here maps to exit code 2
    /// (spec §6).
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            storage: StorageEnvConfig::from_env(),
            http: HttpEnvConfig::from_env()?,
            broker: BrokerEnvConfig::from_env()?,
            planner: PlannerEnvConfig::from_env()?,
            scheduler: SchedulerEnvConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_succeeds_with_no_variables_set() {
        let config = Config {
            storage: StorageEnvConfig::default(),
            http: HttpEnvConfig::default(),
            broker: BrokerEnvConfig::default(),
            planner: PlannerEnvConfig::default(),
            scheduler: SchedulerEnvConfig::default(),
        };
        assert_eq!(config.http.port, 8001);
    }
}
