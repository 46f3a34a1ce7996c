use serde::{Deserialize, Serialize};

use crate::logic::features::LayoutInfo;
use crate::logic::model::EngineStatus;

/// Three-field answer of `Guardian::status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianStatus {
    pub active: bool,
    pub model_ready: bool,
    pub zone_count: usize,
}

/// Extended status for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub version: String,
    #[serde(flatten)]
    pub status: GuardianStatus,

    pub layout: LayoutInfo,
    pub model: EngineStatus,
    pub renotify_interval_secs: u64, // 0 = every entry
}
