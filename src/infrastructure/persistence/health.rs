//! Storage health service: periodic integrity scan plus auto-recovery from
//! the most recent verified backup when a non-ledger store is corrupt
//! (spec §4.1, §6). Ledger corruption is never auto-recovered — it surfaces
//! as exit code 1 (spec §6) and requires an operator decision.

use tracing::{error, warn};

use crate::domain::errors::{ErrorKind, SentinelResult};

use super::backup::{BackupService, BackupTier};
use super::stores::StorageSubstrate;

#[derive(Debug, Clone)]
pub struct StorageHealthReport {
    pub healthy: bool,
    pub ledger_corrupt: bool,
    pub failures: Vec<String>,
}

pub struct HealthService<'a> {
    substrate: &'a StorageSubstrate,
    backups: &'a BackupService,
}

impl<'a> HealthService<'a> {
    pub fn new(substrate: &'a StorageSubstrate, backups: &'a BackupService) -> Self {
        Self { substrate, backups }
    }

    pub async fn scan(&self) -> StorageHealthReport {
        let mut failures = Vec::new();
        let mut ledger_corrupt = false;

        for store in self.substrate.all() {
            if let Err(err) = store.quick_check().await {
                warn!(store = store.name, error = %err, "store failed integrity scan");
                if store.name == "ledger" {
                    ledger_corrupt = true;
                }
                failures.push(format!("{}: {}", store.name, err));
            }
        }

        StorageHealthReport {
            healthy: failures.is_empty(),
            ledger_corrupt,
            failures,
        }
    }

    /// Attempts to recover from the newest daily backup. Returns an error
    /// classified `Corrupt` if no recoverable backup exists, which the
    /// caller should treat as unrecoverable.
    pub async fn attempt_recovery(&self, tier: BackupTier, stamp: &str) -> SentinelResult<()> {
        match self.backups.restore(tier, stamp).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(error = %err, "backup restore failed");
                Err(crate::domain::errors::SentinelError::new(
                    ErrorKind::Corrupt,
                    format!("unable to recover storage from backup: {err}"),
                ))
            }
        }
    }
}
