//! Guardian Commands - control surface
//!
//! Enable and disable return plain booleans; the actionable reason for a
//! failure is logged through `GuardianError::user_message`. `try_enable`
//! exposes the error itself for hosts that render their own message.

use std::sync::Arc;

use crate::constants;
use crate::logic::config::GuardianConfig;
use crate::logic::cooldown::CooldownPolicy;
use crate::logic::error::{GuardianError, GuardianResult};
use crate::logic::features::LayoutInfo;
use crate::logic::handler::GeofenceEventHandler;
use crate::logic::model::{InferenceAdapter, InferenceError};
use crate::logic::notify::NotificationDispatcher;
use crate::logic::permissions::PermissionManager;
use crate::logic::platform::{GeofencingService, NotificationService, PermissionService};
use crate::logic::scheduler::GeofenceScheduler;
use crate::logic::zones::{self, DangerZone, DangerZoneRegistry, GeofenceRegion};

use super::guardian_status::{GuardianStatus, StatusReport};

/// Platform services the guardian runs against
pub struct PlatformServices {
    pub geofencing: Arc<dyn GeofencingService>,
    pub permissions: Arc<dyn PermissionService>,
    pub notifications: Arc<dyn NotificationService>,
}

pub struct Guardian {
    config: GuardianConfig,
    registry: Arc<DangerZoneRegistry>,
    inference: Arc<InferenceAdapter>,
    scheduler: GeofenceScheduler,
    handler: GeofenceEventHandler,
}

impl Guardian {
    /// Wire the pipeline from configuration. The model is not loaded here.
    pub fn from_config(config: GuardianConfig, services: PlatformServices) -> Self {
        let registry = match &config.zones.path {
            Some(path) => DangerZoneRegistry::from_file(path.clone()),
            None => DangerZoneRegistry::bundled(),
        };
        let inference = InferenceAdapter::new(&config.model);
        Self::new(config, Arc::new(registry), Arc::new(inference), services)
    }

    pub fn new(
        config: GuardianConfig,
        registry: Arc<DangerZoneRegistry>,
        inference: Arc<InferenceAdapter>,
        services: PlatformServices,
    ) -> Self {
        let scheduler = GeofenceScheduler::new(
            services.geofencing,
            PermissionManager::new(services.permissions),
            Arc::clone(&registry),
            config.zones.radius_m,
        );

        let cooldown = if config.policy.min_renotify_interval_secs > 0 {
            CooldownPolicy::new(config.policy.min_renotify_interval_secs, &config.data_dir())
        } else {
            CooldownPolicy::disabled()
        };

        let handler = GeofenceEventHandler::new(
            Arc::clone(&registry),
            Arc::clone(&inference),
            NotificationDispatcher::new(services.notifications),
            config.heuristics.clone(),
            cooldown,
        );

        Self { config, registry, inference, scheduler, handler }
    }

    /// Load the ONNX model named by the configuration
    pub fn load_model(&self) -> Result<(), InferenceError> {
        self.inference
            .load_onnx(&self.config.model_path(), &self.config.metadata_path())
    }

    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    /// Turn the guardian on. `false` leaves it inactive.
    pub async fn enable(&self) -> bool {
        match self.try_enable().await {
            Ok(count) => {
                log::info!("Silent Guardian enabled for {} danger zones", count);
                true
            }
            Err(e) => {
                log::error!("Silent Guardian not enabled: {}", e.user_message());
                false
            }
        }
    }

    /// Returns the number of watched regions
    pub async fn try_enable(&self) -> GuardianResult<usize> {
        if self.config.policy.require_model_on_enable && !self.inference.is_model_loaded() {
            return Err(GuardianError::InferenceUnavailable("model not loaded".to_string()));
        }
        self.scheduler.try_start().await
    }

    pub async fn disable(&self) {
        self.scheduler.stop().await;
    }

    pub async fn status(&self) -> GuardianStatus {
        GuardianStatus {
            active: self.scheduler.is_active().await,
            model_ready: self.inference.is_model_loaded(),
            zone_count: self.registry.count(),
        }
    }

    pub async fn status_report(&self) -> StatusReport {
        StatusReport {
            version: constants::APP_VERSION.to_string(),
            status: self.status().await,
            layout: LayoutInfo::current(),
            model: self.inference.status(),
            renotify_interval_secs: self.config.policy.min_renotify_interval_secs,
        }
    }

    pub fn danger_zones(&self) -> GuardianResult<&[DangerZone]> {
        self.registry.list()
    }

    /// Regions that `enable` would register
    pub fn regions(&self) -> GuardianResult<Vec<GeofenceRegion>> {
        Ok(zones::build(self.registry.list()?, self.config.zones.radius_m))
    }

    /// Handler for geofence transitions delivered to this process
    pub fn event_handler(&self) -> &GeofenceEventHandler {
        &self.handler
    }
}
