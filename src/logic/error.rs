//! Guardian error taxonomy
//!
//! Every variant is recovered locally. The control surface turns them into a
//! boolean plus a log line, and `user_message()` is the text shown to the user.

use thiserror::Error;

use crate::logic::platform::PermissionKind;

pub type GuardianResult<T> = Result<T, GuardianError>;

#[derive(Debug, Error)]
pub enum GuardianError {
    #[error("{step} permission denied")]
    PermissionDenied { step: PermissionKind },

    #[error("danger zone registry is empty")]
    EmptyRegistry,

    #[error("failed to load danger zones from {source_name}: {reason}")]
    DataLoad { source_name: String, reason: String },

    #[error("inference unavailable: {0}")]
    InferenceUnavailable(String),

    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error("geofencing is not supported on this platform")]
    UnsupportedPlatform,

    #[error("platform error: {0}")]
    Platform(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GuardianError {
    pub fn data_load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        GuardianError::DataLoad {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Actionable message for the enable/disable control
    pub fn user_message(&self) -> String {
        match self {
            GuardianError::PermissionDenied { step: PermissionKind::ForegroundLocation } => {
                "Location access was denied. Allow location access for this app in Settings, then try again.".to_string()
            }
            GuardianError::PermissionDenied { step: PermissionKind::BackgroundLocation } => {
                "Background location was denied. Set location access to \"Always\" in Settings so danger zones can be watched while the app is closed.".to_string()
            }
            GuardianError::PermissionDenied { step: PermissionKind::Notifications } => {
                "Notifications are disabled. Enable them in Settings to receive spending alerts.".to_string()
            }
            GuardianError::EmptyRegistry => {
                "No danger zones are available to monitor. Add spending history so danger zones can be identified, then try again.".to_string()
            }
            GuardianError::DataLoad { .. } => {
                "The danger zone list could not be read. Reinstall or refresh the danger zone data and try again.".to_string()
            }
            GuardianError::InferenceUnavailable(_) => {
                "The on-device prediction model is not loaded. Install the model files and restart the app.".to_string()
            }
            GuardianError::UnsupportedPlatform => {
                "Silent Guardian geofencing is only available on devices with location services.".to_string()
            }
            other => format!("Could not enable Silent Guardian: {}", other),
        }
    }
}
