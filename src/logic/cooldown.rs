//! Re-notify Cooldown Ledger
//!
//! Minimum interval between two nudges for the same region. The handler may
//! run in a fresh process for every event, so the last-notified times are
//! kept on disk rather than in memory. An interval of 0 disables the policy
//! and every entry can notify.
//!
//! One file per region, named by the SHA-256 of the identifier, so events for
//! different regions never touch the same file. Each file is replaced with a
//! temp-file-and-rename, so a reader sees either the old or the new entry.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::logic::error::GuardianResult;

const LEDGER_DIR: &str = "cooldown";
const ENTRY_EXT: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    region: String,
    last_notified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CooldownPolicy {
    interval: Duration,
    ledger_dir: PathBuf,
}

impl CooldownPolicy {
    pub fn new(interval_secs: u64, data_dir: &Path) -> Self {
        let secs = i64::try_from(interval_secs).unwrap_or(i64::MAX);
        Self {
            interval: Duration::try_seconds(secs).unwrap_or(Duration::MAX),
            ledger_dir: data_dir.join(LEDGER_DIR),
        }
    }

    pub fn disabled() -> Self {
        Self {
            interval: Duration::zero(),
            ledger_dir: PathBuf::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval > Duration::zero()
    }

    /// Whether `region` was nudged less than one interval before `now`.
    /// An unreadable entry never suppresses.
    pub fn is_cooling_down(&self, region: &str, now: DateTime<Utc>) -> bool {
        if !self.is_enabled() {
            return false;
        }

        match self.read(region) {
            Ok(Some(entry)) => now.signed_duration_since(entry.last_notified) < self.interval,
            Ok(None) => false,
            Err(e) => {
                log::warn!("Cooldown entry for {} unreadable, not suppressing: {}", region, e);
                false
            }
        }
    }

    /// Remember that `region` was nudged at `now`
    pub fn record(&self, region: &str, now: DateTime<Utc>) {
        if !self.is_enabled() {
            return;
        }

        let entry = LedgerEntry { region: region.to_string(), last_notified: now };
        if let Err(e) = self.write(&entry) {
            log::warn!("Failed to update cooldown ledger for {}: {}", region, e);
        }
    }

    fn entry_path(&self, region: &str) -> PathBuf {
        let name = hex::encode(Sha256::digest(region.as_bytes()));
        self.ledger_dir.join(format!("{}.{}", name, ENTRY_EXT))
    }

    fn read(&self, region: &str) -> GuardianResult<Option<LedgerEntry>> {
        let path = self.entry_path(region);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read(&path)?;
        let entry: LedgerEntry = serde_json::from_slice(&content)?;
        Ok(Some(entry).filter(|e| e.region == region))
    }

    fn write(&self, entry: &LedgerEntry) -> GuardianResult<()> {
        fs::create_dir_all(&self.ledger_dir)?;

        let path = self.entry_path(&entry.region);
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, serde_json::to_vec_pretty(entry)?)?;

        if let Err(e) = fs::rename(&tmp, &path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                log::debug!("Could not remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e.into());
        }
        Ok(())
    }
}
