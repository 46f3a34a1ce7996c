//! Guardian Configuration
//!
//! Loaded from a JSON file, then overridden by environment variables.
//! Every field has a default, so an absent file is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::error::{GuardianError, GuardianResult};

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    /// Dataset file. `None` uses the dataset bundled with the binary.
    pub path: Option<PathBuf>,
    /// Geofence radius in meters
    pub radius_m: f64,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            path: None,
            radius_m: constants::DEFAULT_REGION_RADIUS_M,
        }
    }
}

/// Fixed stand-ins for values the background path cannot measure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    pub distance_to_merchant: f32,
    pub budget_utilization: f32,
    pub dwell_time: f32,
    pub regret_normalizer: f32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            distance_to_merchant: constants::DEFAULT_DISTANCE_TO_MERCHANT,
            budget_utilization: constants::DEFAULT_BUDGET_UTILIZATION,
            dwell_time: constants::DEFAULT_DWELL_TIME_SECS,
            regret_normalizer: constants::DEFAULT_REGRET_NORMALIZER,
        }
    }
}

impl HeuristicConfig {
    /// `regret_count / regret_normalizer`, clamped to [0, 1]
    pub fn regret_rate(&self, regret_count: u32) -> f32 {
        if self.regret_normalizer <= 0.0 {
            return 0.0;
        }
        (regret_count as f32 / self.regret_normalizer).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX model file. `None` looks in the data directory.
    pub model_path: Option<PathBuf>,
    /// Metadata sidecar. `None` looks next to the model.
    pub metadata_path: Option<PathBuf>,
    /// Probability at or above which risk is "medium"
    pub medium_floor: f32,
    pub inference_timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            metadata_path: None,
            medium_floor: constants::DEFAULT_MEDIUM_FLOOR,
            inference_timeout_ms: constants::DEFAULT_INFERENCE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum seconds between two nudges for one region, 0 disables
    pub min_renotify_interval_secs: u64,
    /// Opt-in: refuse to enable while the model is not loaded.
    /// Off by default; events without a model just never notify.
    pub require_model_on_enable: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_renotify_interval_secs: constants::DEFAULT_RENOTIFY_INTERVAL_SECS,
            require_model_on_enable: false,
        }
    }
}

// ============================================================================
// GUARDIAN CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianConfig {
    pub zones: ZonesConfig,
    pub heuristics: HeuristicConfig,
    pub model: ModelConfig,
    pub policy: PolicyConfig,
    /// Platform state directory. `None` uses the local data dir.
    pub data_dir: Option<PathBuf>,
}

impl GuardianConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.json")
    }

    /// Load `path`, or `GUARDIAN_CONFIG`, or the default location, then apply env overrides.
    /// A missing file at the default location yields the defaults.
    pub fn load(path: Option<&Path>) -> GuardianResult<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| constants::get_config_path().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    log::debug!("No config at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> GuardianResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GuardianError::Config(format!("{}: {}", path.display(), e)))?;
        let config: GuardianConfig = serde_json::from_str(&content)
            .map_err(|e| GuardianError::Config(format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(path) = constants::get_zones_path() {
            self.zones.path = Some(PathBuf::from(path));
        }
        if let Some(path) = constants::get_model_path() {
            self.model.model_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = constants::get_data_dir() {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = constants::get_renotify_interval() {
            self.policy.min_renotify_interval_secs = secs;
        }
        if let Some(ms) = constants::get_inference_timeout_ms() {
            self.model.inference_timeout_ms = ms;
        }
        if let Some(required) = constants::is_model_required_on_enable() {
            self.policy.require_model_on_enable = required;
        }
    }

    pub fn validate(&self) -> GuardianResult<()> {
        if !(self.zones.radius_m.is_finite() && self.zones.radius_m > 0.0) {
            return Err(GuardianError::Config(format!("zones.radius_m must be positive, got {}", self.zones.radius_m)));
        }
        if !(self.heuristics.regret_normalizer > 0.0) {
            return Err(GuardianError::Config("heuristics.regret_normalizer must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.model.medium_floor) {
            return Err(GuardianError::Config("model.medium_floor must be within 0..1".to_string()));
        }
        if self.model.inference_timeout_ms == 0 {
            return Err(GuardianError::Config("model.inference_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn model_path(&self) -> PathBuf {
        self.model.model_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(constants::DEFAULT_MODEL_FILE))
    }

    /// Metadata sidecar, defaulting to the model's directory
    pub fn metadata_path(&self) -> PathBuf {
        if let Some(path) = &self.model.metadata_path {
            return path.clone();
        }
        let model_path = self.model_path();
        model_path
            .parent()
            .map(|dir| dir.join(constants::DEFAULT_MODEL_META_FILE))
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_MODEL_META_FILE))
    }
}

/// `<data_local_dir>/silent-guardian`
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::APP_NAME)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuardianConfig::default();
        assert_eq!(config.zones.radius_m, 200.0);
        assert_eq!(config.heuristics.distance_to_merchant, 0.1);
        assert_eq!(config.heuristics.budget_utilization, 0.75);
        assert_eq!(config.heuristics.dwell_time, 0.0);
        assert_eq!(config.policy.min_renotify_interval_secs, 0);
        assert!(!config.policy.require_model_on_enable);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"policy": {"min_renotify_interval_secs": 900}, "heuristics": {"budget_utilization": 0.5}}"#).unwrap();

        let config = GuardianConfig::from_file(&path).unwrap();
        assert_eq!(config.policy.min_renotify_interval_secs, 900);
        assert!(!config.policy.require_model_on_enable);
        assert_eq!(config.heuristics.budget_utilization, 0.5);
        assert_eq!(config.heuristics.regret_normalizer, 100.0);
        assert_eq!(config.zones.radius_m, 200.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = GuardianConfig::default();
        config.zones.radius_m = 0.0;
        assert!(matches!(config.validate(), Err(GuardianError::Config(_))));

        let mut config = GuardianConfig::default();
        config.heuristics.regret_normalizer = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metadata_path_next_to_model() {
        let mut config = GuardianConfig::default();
        config.model.model_path = Some(PathBuf::from("/opt/models/pp.onnx"));
        assert_eq!(config.metadata_path(), PathBuf::from("/opt/models/purchase_predictor_meta.json"));
    }

    #[test]
    fn test_regret_rate() {
        let heuristics = HeuristicConfig::default();
        assert!((heuristics.regret_rate(40) - 0.4).abs() < 1e-6);
        assert_eq!(heuristics.regret_rate(0), 0.0);
        assert_eq!(heuristics.regret_rate(1000), 1.0);
    }
}
