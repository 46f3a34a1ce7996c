//! Danger Zone Registry
//!
//! Read-only catalog of monitored locations. Loaded once, then served from
//! the cache for the lifetime of the process.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::logic::error::{GuardianError, GuardianResult};
use super::region::region_identifier;

/// Dataset shipped with the binary
const BUNDLED_ZONES: &str = include_str!("../../../data/danger_zones.json");

/// A geographic point historically associated with regretted spending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DangerZone {
    pub merchant: String,
    pub lat: f64,
    pub lng: f64,
    pub regret_count: u32,
}

impl DangerZone {
    /// Join key shared with the geofence region built from this zone
    pub fn identifier(&self) -> String {
        region_identifier(&self.merchant, self.lat, self.lng)
    }

    fn validate(&self, index: usize) -> Result<(), String> {
        if self.merchant.trim().is_empty() {
            return Err(format!("record {}: merchant is empty", index));
        }
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("record {}: latitude {} out of range", index, self.lat));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(format!("record {}: longitude {} out of range", index, self.lng));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum ZoneSource {
    File(PathBuf),
    Bundled,
    Inline(Vec<DangerZone>),
}

impl ZoneSource {
    fn name(&self) -> String {
        match self {
            ZoneSource::File(path) => path.display().to_string(),
            ZoneSource::Bundled => "<bundled>".to_string(),
            ZoneSource::Inline(_) => "<inline>".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct DangerZoneRegistry {
    source: ZoneSource,
    zones: OnceCell<Vec<DangerZone>>,
}

impl DangerZoneRegistry {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self { source: ZoneSource::File(path.into()), zones: OnceCell::new() }
    }

    pub fn bundled() -> Self {
        Self { source: ZoneSource::Bundled, zones: OnceCell::new() }
    }

    pub fn from_zones(zones: Vec<DangerZone>) -> Self {
        Self { source: ZoneSource::Inline(zones), zones: OnceCell::new() }
    }

    /// Read and validate the dataset (bypasses the cache)
    pub fn load(&self) -> GuardianResult<Vec<DangerZone>> {
        let source_name = self.source.name();
        let raw = match &self.source {
            ZoneSource::File(path) => read_zone_file(path)?,
            ZoneSource::Bundled => parse_zones(BUNDLED_ZONES, &source_name)?,
            ZoneSource::Inline(zones) => zones.clone(),
        };

        let zones = validate_and_dedupe(raw, &source_name)?;
        log::info!("Loaded {} danger zones from {}", zones.len(), source_name);
        Ok(zones)
    }

    /// Cached zone list, loaded on first use
    pub fn list(&self) -> GuardianResult<&[DangerZone]> {
        self.zones
            .get_or_try_init(|| self.load())
            .map(|zones| zones.as_slice())
    }

    /// Number of zones, 0 when the dataset cannot be loaded
    pub fn count(&self) -> usize {
        match self.list() {
            Ok(zones) => zones.len(),
            Err(e) => {
                log::warn!("Danger zones unavailable: {}", e);
                0
            }
        }
    }

    /// Resolve a region identifier by exact match
    pub fn find(&self, identifier: &str) -> GuardianResult<&DangerZone> {
        self.list()?
            .iter()
            .find(|zone| zone.identifier() == identifier)
            .ok_or_else(|| GuardianError::UnknownRegion(identifier.to_string()))
    }
}

fn read_zone_file(path: &Path) -> GuardianResult<Vec<DangerZone>> {
    let source_name = path.display().to_string();
    let content = fs::read_to_string(path)
        .map_err(|e| GuardianError::data_load(&source_name, e.to_string()))?;
    parse_zones(&content, &source_name)
}

fn parse_zones(content: &str, source_name: &str) -> GuardianResult<Vec<DangerZone>> {
    serde_json::from_str::<Vec<DangerZone>>(content)
        .map_err(|e| GuardianError::data_load(source_name, e.to_string()))
}

/// Reject malformed records and keep the first zone of each identity
fn validate_and_dedupe(raw: Vec<DangerZone>, source_name: &str) -> GuardianResult<Vec<DangerZone>> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut zones = Vec::with_capacity(raw.len());

    for (index, zone) in raw.into_iter().enumerate() {
        zone.validate(index)
            .map_err(|reason| GuardianError::data_load(source_name, reason))?;

        if !seen.insert(zone.identifier()) {
            log::warn!("Duplicate danger zone skipped: {}", zone.identifier());
            continue;
        }
        zones.push(zone);
    }

    Ok(zones)
}
