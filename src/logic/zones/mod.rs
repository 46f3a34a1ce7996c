//! Zones Module - Danger zone catalog and geofence regions

pub mod registry;
pub mod region;


pub use registry::{DangerZone, DangerZoneRegistry};
pub use region::{build, region_identifier, GeofenceRegion};
