//! Permission Lifecycle Manager
//!
//! Acquires foreground location, background location and notifications,
//! in that order. Both location steps are mandatory; notifications are not.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::logic::error::{GuardianError, GuardianResult};
use crate::logic::platform::{PermissionKind, PermissionService, PermissionStatus};

/// Outcome of a successful `try_request_all`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSummary {
    pub foreground_location: bool,
    pub background_location: bool,
    pub notifications: bool,
}

#[derive(Clone)]
pub struct PermissionManager {
    service: Arc<dyn PermissionService>,
}

impl PermissionManager {
    pub fn new(service: Arc<dyn PermissionService>) -> Self {
        Self { service }
    }

    /// Request all three in order. `false` as soon as a mandatory step is denied.
    pub async fn request_all(&self) -> bool {
        match self.try_request_all().await {
            Ok(_) => true,
            Err(e) => {
                log::error!("Permission request failed: {}", e);
                false
            }
        }
    }

    pub async fn try_request_all(&self) -> GuardianResult<PermissionSummary> {
        self.request_mandatory(PermissionKind::ForegroundLocation).await?;
        log::info!("Foreground location permission granted");

        self.request_mandatory(PermissionKind::BackgroundLocation).await?;
        log::info!("Background location permission granted");

        let notifications = match self.service.request(PermissionKind::Notifications).await {
            Ok(status) if status.is_granted() => {
                log::info!("Notification permission granted");
                true
            }
            Ok(_) => {
                log::warn!("Notification permission denied (optional)");
                false
            }
            Err(e) => {
                log::warn!("Notification permission request failed (optional): {}", e);
                false
            }
        };

        Ok(PermissionSummary {
            foreground_location: true,
            background_location: true,
            notifications,
        })
    }

    async fn request_mandatory(&self, kind: PermissionKind) -> GuardianResult<()> {
        let status = self.service.request(kind).await.map_err(|e| {
            log::error!("{} permission request failed: {}", kind, e);
            GuardianError::PermissionDenied { step: kind }
        })?;

        if status.is_granted() {
            Ok(())
        } else {
            log::error!("{} permission denied", kind);
            Err(GuardianError::PermissionDenied { step: kind })
        }
    }

    /// Both location permissions already granted, without prompting
    pub async fn location_granted(&self) -> bool {
        self.is_granted(PermissionKind::ForegroundLocation).await
            && self.is_granted(PermissionKind::BackgroundLocation).await
    }

    async fn is_granted(&self, kind: PermissionKind) -> bool {
        match self.service.status(kind).await {
            Ok(status) => status == PermissionStatus::Granted,
            Err(e) => {
                log::warn!("Could not read {} permission: {}", kind, e);
                false
            }
        }
    }
}
