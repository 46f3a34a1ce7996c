//! File-backed geofencing and permission services
//!
//! State lives in the data directory so a process started for a single
//! event sees the registration and grants made by an earlier one.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::logic::error::{GuardianError, GuardianResult};
use crate::logic::zones::GeofenceRegion;

use super::{GeofencingService, PermissionKind, PermissionService, PermissionStatus};

const GEOFENCES_FILE: &str = "geofences.json";
const PERMISSIONS_FILE: &str = "permissions.json";

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> GuardianResult<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Replace `path` via a sibling temp file, so readers never see a partial write
fn write_json<T: Serialize>(path: &Path, value: &T) -> GuardianResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

// ============================================================================
// GEOFENCING
// ============================================================================

/// Task registrations persisted as `{task: [regions]}`
pub struct LocalGeofencing {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalGeofencing {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(GEOFENCES_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Regions currently registered under `task`
    pub fn regions(&self, task: &str) -> GuardianResult<Vec<GeofenceRegion>> {
        let _guard = self.lock.lock();
        let tasks: HashMap<String, Vec<GeofenceRegion>> = read_json(&self.path)?;
        Ok(tasks.get(task).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl GeofencingService for LocalGeofencing {
    async fn start_geofencing(&self, task: &str, regions: &[GeofenceRegion]) -> Result<(), String> {
        let _guard = self.lock.lock();
        let mut tasks: HashMap<String, Vec<GeofenceRegion>> =
            read_json(&self.path).map_err(|e| e.to_string())?;
        tasks.insert(task.to_string(), regions.to_vec());
        write_json(&self.path, &tasks).map_err(|e| e.to_string())
    }

    async fn stop_geofencing(&self, task: &str) -> Result<(), String> {
        let _guard = self.lock.lock();
        let mut tasks: HashMap<String, Vec<GeofenceRegion>> =
            read_json(&self.path).map_err(|e| e.to_string())?;
        if tasks.remove(task).is_none() {
            return Err(format!("task {} is not registered", task));
        }
        write_json(&self.path, &tasks).map_err(|e| e.to_string())
    }

    async fn is_task_registered(&self, task: &str) -> Result<bool, String> {
        let _guard = self.lock.lock();
        let tasks: HashMap<String, Vec<GeofenceRegion>> =
            read_json(&self.path).map_err(|e| e.to_string())?;
        Ok(tasks.contains_key(task))
    }
}

// ============================================================================
// PERMISSIONS
// ============================================================================

type Prompt = Box<dyn Fn(PermissionKind) -> bool + Send + Sync>;

/// Grants persisted as `{kind: status}`. Undetermined requests go to the prompt.
pub struct LocalPermissions {
    path: PathBuf,
    prompt: Prompt,
    lock: Mutex<()>,
}

impl LocalPermissions {
    /// Prompts on the terminal; denies when stdin is not interactive
    pub fn new(data_dir: &Path) -> Self {
        Self::with_prompt(data_dir, terminal_prompt)
    }

    pub fn with_prompt(
        data_dir: &Path,
        prompt: impl Fn(PermissionKind) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            path: data_dir.join(PERMISSIONS_FILE),
            prompt: Box::new(prompt),
            lock: Mutex::new(()),
        }
    }

    /// Status without prompting. Unreadable state counts as undetermined.
    pub fn current(&self, kind: PermissionKind) -> PermissionStatus {
        let _guard = self.lock.lock();
        match read_json::<HashMap<PermissionKind, PermissionStatus>>(&self.path) {
            Ok(grants) => grants.get(&kind).copied().unwrap_or_default(),
            Err(e) => {
                log::warn!("Permission state unreadable: {}", e);
                PermissionStatus::Undetermined
            }
        }
    }

    /// Change a grant directly, as the system Settings screen would.
    /// An unreadable state file is reported, never overwritten.
    pub fn set(&self, kind: PermissionKind, status: PermissionStatus) -> GuardianResult<()> {
        let _guard = self.lock.lock();
        let mut grants: HashMap<PermissionKind, PermissionStatus> = read_json(&self.path)
            .map_err(|e| {
                GuardianError::Platform(format!(
                    "permission state {} unreadable, fix or remove it: {}",
                    self.path.display(),
                    e
                ))
            })?;
        grants.insert(kind, status);
        write_json(&self.path, &grants)
    }

    pub fn snapshot(&self) -> Vec<(PermissionKind, PermissionStatus)> {
        PermissionKind::ALL
            .iter()
            .map(|kind| (*kind, self.current(*kind)))
            .collect()
    }
}

#[async_trait]
impl PermissionService for LocalPermissions {
    async fn status(&self, kind: PermissionKind) -> Result<PermissionStatus, String> {
        Ok(self.current(kind))
    }

    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus, String> {
        let current = self.current(kind);
        if current != PermissionStatus::Undetermined {
            return Ok(current);
        }

        let status = if (self.prompt)(kind) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        self.set(kind, status).map_err(|e| e.to_string())?;
        Ok(status)
    }
}

fn terminal_prompt(kind: PermissionKind) -> bool {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        log::warn!("{} permission requested without a terminal, denying", kind);
        return false;
    }

    print!("Allow {} access for Silent Guardian? [y/N] ", kind.to_string().to_lowercase());
    if let Err(e) = io::stdout().flush() {
        log::warn!("Could not show {} permission prompt: {}", kind, e);
    }

    let mut answer = String::new();
    if stdin.lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
