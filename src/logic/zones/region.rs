//! Geofence Region Builder
//!
//! Maps danger zones 1:1 onto platform geofence descriptors.

use serde::{Deserialize, Serialize};

use super::registry::DangerZone;

/// Circular monitored area handed to the platform geofencing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceRegion {
    pub identifier: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub notify_on_enter: bool,
    pub notify_on_exit: bool,
}

/// `merchant_lat_lng`, coordinates in shortest round-trip form (`1.0` -> `1`)
pub fn region_identifier(merchant: &str, lat: f64, lng: f64) -> String {
    format!("{}_{}_{}", merchant, lat, lng)
}

impl GeofenceRegion {
    pub fn from_zone(zone: &DangerZone, radius: f64) -> Self {
        Self {
            identifier: zone.identifier(),
            latitude: zone.lat,
            longitude: zone.lng,
            radius,
            notify_on_enter: true,
            notify_on_exit: false,
        }
    }
}

/// Build one enter-only region per zone, preserving input order
pub fn build(zones: &[DangerZone], radius: f64) -> Vec<GeofenceRegion> {
    zones.iter().map(|zone| GeofenceRegion::from_zone(zone, radius)).collect()
}
