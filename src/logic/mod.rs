//! Logic Module - Guardian pipeline
//!
//! - `zones/` - Danger zone registry and geofence regions
//! - `features/` - Feature layout and per-event vector
//! - `model/` - On-device inference and risk thresholds
//! - `platform/` - OS collaborators (geofencing, permissions, notifications)

pub mod config;
pub mod cooldown;
pub mod error;
pub mod handler;
pub mod notify;
pub mod permissions;
pub mod scheduler;

pub mod features;
pub mod model;
pub mod platform;
pub mod zones;

#[cfg(test)]
pub(crate) mod testing;
