//! Backup service: daily/weekly/monthly tiers with file-copy snapshots and
//! a restore-into-temp-location integrity check (spec §4.1).

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::info;

use crate::domain::errors::SentinelError;
use crate::domain::errors::SentinelResult;

use super::store::{Store, StoreProfile};
use super::stores::StorageSubstrate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupTier {
    Daily,
    Weekly,
    Monthly,
}

impl BackupTier {
    fn dir_name(&self) -> &'static str {
        match self {
            BackupTier::Daily => "daily",
            BackupTier::Weekly => "weekly",
            BackupTier::Monthly => "monthly",
        }
    }

    /// How many snapshots of this tier are retained before the oldest is pruned.
    fn retention(&self) -> usize {
        match self {
            BackupTier::Daily => 7,
            BackupTier::Weekly => 4,
            BackupTier::Monthly => 12,
        }
    }
}

pub struct BackupService {
    backup_root: PathBuf,
    data_dir: PathBuf,
}

impl BackupService {
    pub fn new(data_dir: PathBuf, backup_root: PathBuf) -> Self {
        Self { data_dir, backup_root }
    }

    /// Checkpoints every store's WAL, then copies the `.db` files into a
    /// timestamped snapshot directory under the tier.
    pub async fn run(&self, substrate: &StorageSubstrate, tier: BackupTier) -> SentinelResult<PathBuf> {
        for store in substrate.all() {
            store.wal_checkpoint_truncate().await?;
        }

        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let snapshot_dir = self.backup_root.join(tier.dir_name()).join(&stamp);
        fs::create_dir_all(&snapshot_dir)
            .await
            .map_err(|e| SentinelError::internal(format!("create backup dir: {e}")))?;

        for name in [
            "universe", "config", "ledger", "portfolio", "history", "cache", "client_data",
        ] {
            let src = self.data_dir.join(format!("{name}.db"));
            let dst = snapshot_dir.join(format!("{name}.db"));
            fs::copy(&src, &dst)
                .await
                .map_err(|e| SentinelError::internal(format!("copy {name}: {e}")))?;
        }

        self.verify(&snapshot_dir).await?;
        self.prune(tier).await?;
        info!(tier = tier.dir_name(), path = %snapshot_dir.display(), "backup complete");
        Ok(snapshot_dir)
    }

    /// Opens each copied file at a temp location and runs an integrity scan
    /// so a corrupt snapshot is caught before it is ever relied on.
    async fn verify(&self, snapshot_dir: &Path) -> SentinelResult<()> {
        for name in [
            "universe", "config", "ledger", "portfolio", "history", "cache", "client_data",
        ] {
            let path = snapshot_dir.join(format!("{name}.db"));
            let store = Store::open(&path, StoreProfile::Speed, "backup-verify").await?;
            store.quick_check().await?;
        }
        Ok(())
    }

    async fn prune(&self, tier: BackupTier) -> SentinelResult<()> {
        let tier_dir = self.backup_root.join(tier.dir_name());
        let mut entries = match fs::read_dir(&tier_dir).await {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };
        let mut snapshots = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SentinelError::internal(e.to_string()))?
        {
            snapshots.push(entry.path());
        }
        snapshots.sort();
        while snapshots.len() > tier.retention() {
            let oldest = snapshots.remove(0);
            let _ = fs::remove_dir_all(&oldest).await;
        }
        Ok(())
    }

    /// Restores a named tier/stamp snapshot over the live data directory.
    /// Callers must stop all stores before invoking this.
    pub async fn restore(&self, tier: BackupTier, stamp: &str) -> SentinelResult<()> {
        let snapshot_dir = self.backup_root.join(tier.dir_name()).join(stamp);
        self.verify(&snapshot_dir).await?;
        for name in [
            "universe", "config", "ledger", "portfolio", "history", "cache", "client_data",
        ] {
            let src = snapshot_dir.join(format!("{name}.db"));
            let dst = self.data_dir.join(format!("{name}.db"));
            fs::copy(&src, &dst)
                .await
                .map_err(|e| SentinelError::internal(format!("restore {name}: {e}")))?;
        }
        Ok(())
    }
}
