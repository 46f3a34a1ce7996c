//! Geofence Task Scheduler
//!
//! Registers one persistent, OS-managed geofencing task for the full zone
//! set. Registration state is never cached here: `is_active` asks the
//! platform, because the process answering may not be the one that
//! registered.

use std::sync::Arc;

use crate::constants::GEOFENCING_TASK;
use crate::logic::error::{GuardianError, GuardianResult};
use crate::logic::permissions::PermissionManager;
use crate::logic::platform::GeofencingService;
use crate::logic::zones::{self, DangerZoneRegistry};

#[derive(Clone)]
pub struct GeofenceScheduler {
    geofencing: Arc<dyn GeofencingService>,
    permissions: PermissionManager,
    registry: Arc<DangerZoneRegistry>,
    radius_m: f64,
}

impl GeofenceScheduler {
    pub fn new(
        geofencing: Arc<dyn GeofencingService>,
        permissions: PermissionManager,
        registry: Arc<DangerZoneRegistry>,
        radius_m: f64,
    ) -> Self {
        Self { geofencing, permissions, registry, radius_m }
    }

    /// Start watching every danger zone. `false` leaves the guardian inactive.
    pub async fn start(&self) -> bool {
        match self.try_start().await {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to start geofencing: {}", e);
                false
            }
        }
    }

    /// Like `start`, returning the number of regions registered
    pub async fn try_start(&self) -> GuardianResult<usize> {
        if !self.geofencing.is_supported() {
            return Err(GuardianError::UnsupportedPlatform);
        }

        if !self.permissions.location_granted().await {
            log::warn!("Required location permissions not granted, requesting");
            self.permissions.try_request_all().await?;
        }

        let danger_zones = self.registry.list()?;
        if danger_zones.is_empty() {
            return Err(GuardianError::EmptyRegistry);
        }

        let regions = zones::build(danger_zones, self.radius_m);
        log::info!("Registering {} danger zones for geofencing", regions.len());

        self.geofencing
            .start_geofencing(GEOFENCING_TASK, &regions)
            .await
            .map_err(GuardianError::Platform)?;

        log::info!("Silent Guardian geofencing started successfully");
        Ok(regions.len())
    }

    /// Unregister the watch. No-op when nothing is registered.
    pub async fn stop(&self) {
        match self.geofencing.is_task_registered(GEOFENCING_TASK).await {
            Ok(true) => match self.geofencing.stop_geofencing(GEOFENCING_TASK).await {
                Ok(()) => log::info!("Silent Guardian geofencing stopped"),
                Err(e) => log::error!("Failed to stop geofencing: {}", e),
            },
            Ok(false) => log::debug!("Geofencing not registered, nothing to stop"),
            Err(e) => log::error!("Failed to check geofencing status: {}", e),
        }
    }

    /// Current registration, straight from the platform
    pub async fn is_active(&self) -> bool {
        match self.geofencing.is_task_registered(GEOFENCING_TASK).await {
            Ok(registered) => registered,
            Err(e) => {
                log::error!("Failed to check geofencing status: {}", e);
                false
            }
        }
    }
}
