//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value here can be overridden by `GuardianConfig` or by the
//! environment variable read in the matching helper below.

/// Name of the persistent background geofencing task
pub const GEOFENCING_TASK: &str = "SILENT_GUARDIAN_GEOFENCING";

/// App name (also the data directory name)
pub const APP_NAME: &str = "silent-guardian";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Geofence radius in meters
pub const DEFAULT_REGION_RADIUS_M: f64 = 200.0;

/// Assumed distance (km) right after a region-enter event (~100 m)
pub const DEFAULT_DISTANCE_TO_MERCHANT: f32 = 0.1;

/// Assumed budget usage when the background path cannot read live budgets
pub const DEFAULT_BUDGET_UTILIZATION: f32 = 0.75;

/// Dwell time for an entry-triggered evaluation
pub const DEFAULT_DWELL_TIME_SECS: f32 = 0.0;

/// Divisor that maps a regret count onto [0, 1]
pub const DEFAULT_REGRET_NORMALIZER: f32 = 100.0;

/// Probability at or above which the user is nudged
pub const DEFAULT_NUDGE_THRESHOLD: f32 = 0.70;

/// Probability at or above which the risk level is "medium"
pub const DEFAULT_MEDIUM_FLOOR: f32 = 0.40;

/// Upper bound for a single on-device prediction
pub const DEFAULT_INFERENCE_TIMEOUT_MS: u64 = 2_000;

/// Minimum seconds between two nudges for the same region (0 = every entry)
pub const DEFAULT_RENOTIFY_INTERVAL_SECS: u64 = 0;

/// Default model file names (next to the config / in the data dir)
pub const DEFAULT_MODEL_FILE: &str = "purchase_predictor.onnx";
pub const DEFAULT_MODEL_META_FILE: &str = "purchase_predictor_meta.json";

// ============================================
// Helper functions to read overrides from env
// ============================================

/// Get config file path from environment
pub fn get_config_path() -> Option<String> {
    std::env::var("GUARDIAN_CONFIG").ok()
}

/// Get danger zone dataset path from environment
pub fn get_zones_path() -> Option<String> {
    std::env::var("GUARDIAN_ZONES_PATH").ok()
}

/// Get model path from environment
pub fn get_model_path() -> Option<String> {
    std::env::var("GUARDIAN_MODEL_PATH").ok()
}

/// Get data directory from environment
pub fn get_data_dir() -> Option<String> {
    std::env::var("GUARDIAN_DATA_DIR").ok()
}

/// Get re-notify interval from environment
pub fn get_renotify_interval() -> Option<u64> {
    std::env::var("GUARDIAN_RENOTIFY_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
}

/// Get inference timeout from environment
pub fn get_inference_timeout_ms() -> Option<u64> {
    std::env::var("GUARDIAN_INFERENCE_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
}

/// Check if enabling requires a loaded model (opt-in)
pub fn is_model_required_on_enable() -> Option<bool> {
    std::env::var("GUARDIAN_REQUIRE_MODEL")
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
}
