//! Platform Module - OS collaborators
//!
//! The three services the guardian needs from the operating system:
//! geofencing, permissions and local notifications. Only their boundary
//! lives here; `local` is the file-backed implementation used by the host
//! binary.

pub mod local;
pub mod outbox;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::logic::zones::GeofenceRegion;
use crate::logic::notify::NotificationRequest;

pub use local::{LocalGeofencing, LocalPermissions};
pub use outbox::NotificationOutbox;

// ============================================================================
// PERMISSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    ForegroundLocation,
    BackgroundLocation,
    Notifications,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 3] = [
        PermissionKind::ForegroundLocation,
        PermissionKind::BackgroundLocation,
        PermissionKind::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::ForegroundLocation => "foreground_location",
            PermissionKind::BackgroundLocation => "background_location",
            PermissionKind::Notifications => "notifications",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "foreground_location" | "foreground" => Some(PermissionKind::ForegroundLocation),
            "background_location" | "background" => Some(PermissionKind::BackgroundLocation),
            "notifications" | "notification" => Some(PermissionKind::Notifications),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PermissionKind::ForegroundLocation => "Foreground location",
            PermissionKind::BackgroundLocation => "Background location",
            PermissionKind::Notifications => "Notification",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "granted" => Some(PermissionStatus::Granted),
            "denied" => Some(PermissionStatus::Denied),
            "undetermined" => Some(PermissionStatus::Undetermined),
            _ => None,
        }
    }
}

/// Authorization transport of the operating system
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Current status, never prompts
    async fn status(&self, kind: PermissionKind) -> Result<PermissionStatus, String>;

    /// Ask the user. Already-granted permissions return `Granted` without prompting.
    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus, String>;
}

// ============================================================================
// GEOFENCING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceEventType {
    Enter,
    Exit,
}

impl GeofenceEventType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "enter" => Some(GeofenceEventType::Enter),
            "exit" => Some(GeofenceEventType::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for GeofenceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeofenceEventType::Enter => f.write_str("ENTER"),
            GeofenceEventType::Exit => f.write_str("EXIT"),
        }
    }
}

/// One region transition delivered by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub event_type: GeofenceEventType,
    pub region_identifier: String,
}

/// Raw background task callback: either data or an error from the OS
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInvocation {
    pub data: Option<GeofenceEvent>,
    pub error: Option<String>,
}

/// Persistent OS-managed geofence watch
#[async_trait]
pub trait GeofencingService: Send + Sync {
    /// Whether the device can geofence at all
    fn is_supported(&self) -> bool {
        true
    }

    /// Register `regions` under `task`, replacing any prior registration of `task`
    async fn start_geofencing(&self, task: &str, regions: &[GeofenceRegion]) -> Result<(), String>;

    async fn stop_geofencing(&self, task: &str) -> Result<(), String>;

    async fn is_task_registered(&self, task: &str) -> Result<bool, String>;
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// Local notification center. `present` only enqueues; delivery is not awaited.
pub trait NotificationService: Send + Sync {
    fn present(&self, request: &NotificationRequest) -> Result<(), String>;
}
