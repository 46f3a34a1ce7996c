//! Notification Outbox
//!
//! Append-only JSONL spool standing in for the device notification center.
//! One line per presented notification; nothing is ever rewritten.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::logic::error::GuardianResult;
use crate::logic::notify::NotificationRequest;

use super::local::LocalPermissions;
use super::{NotificationService, PermissionKind};

const OUTBOX_FILE: &str = "notifications.jsonl";

pub struct NotificationOutbox {
    path: PathBuf,
    permissions: Arc<LocalPermissions>,
    lock: Mutex<()>,
}

impl NotificationOutbox {
    pub fn new(data_dir: &Path, permissions: Arc<LocalPermissions>) -> Self {
        Self {
            path: data_dir.join(OUTBOX_FILE),
            permissions,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every notification presented so far, oldest first. Corrupt lines are skipped.
    pub fn read_all(&self) -> GuardianResult<Vec<NotificationRequest>> {
        let _guard = self.lock.lock();
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut requests = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<NotificationRequest>(&line) {
                Ok(request) => requests.push(request),
                Err(e) => log::warn!("Skipping corrupt outbox line: {}", e),
            }
        }
        Ok(requests)
    }

    fn append(&self, request: &NotificationRequest) -> GuardianResult<()> {
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(request)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

impl NotificationService for NotificationOutbox {
    fn present(&self, request: &NotificationRequest) -> Result<(), String> {
        if !self.permissions.current(PermissionKind::Notifications).is_granted() {
            return Err("notification permission not granted".to_string());
        }
        self.append(request).map_err(|e| e.to_string())
    }
}
