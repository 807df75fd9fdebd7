//! Storage directory configuration parsing from environment variables.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StorageEnvConfig {
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
}

impl Default for StorageEnvConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backup_dir: PathBuf::from("./data/backups"),
        }
    }
}

impl StorageEnvConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            data_dir: env::var("SENTINEL_DATA_DIR").map(PathBuf::from).unwrap_or(default.data_dir),
            backup_dir: env::var("SENTINEL_BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.backup_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_live_under_data() {
        let config = StorageEnvConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }
}
