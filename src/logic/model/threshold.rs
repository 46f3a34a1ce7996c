//! Risk Threshold Configuration
//!
//! Maps a regret probability onto a risk level and the nudge decision.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Categorical summary of the purchase-regret probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Engine unavailable or input rejected. Not a reading.
    Error,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Error => "error",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Nudge at or above this probability (0.0 - 1.0)
    pub nudge_threshold: f32,

    /// "medium" at or above this probability
    pub medium_floor: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            nudge_threshold: constants::DEFAULT_NUDGE_THRESHOLD,
            medium_floor: constants::DEFAULT_MEDIUM_FLOOR,
        }
    }
}

impl ThresholdConfig {
    pub fn new(nudge_threshold: f32, medium_floor: f32) -> Self {
        let nudge_threshold = nudge_threshold.clamp(0.0, 1.0);
        Self {
            nudge_threshold,
            medium_floor: medium_floor.clamp(0.0, nudge_threshold),
        }
    }

    pub fn should_nudge(&self, probability: f32) -> bool {
        probability >= self.nudge_threshold
    }

    pub fn risk_level(&self, probability: f32) -> RiskLevel {
        if probability >= self.nudge_threshold {
            RiskLevel::High
        } else if probability >= self.medium_floor {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_config() {
        let config = ThresholdConfig::default();
        assert_eq!(config.nudge_threshold, 0.7);
        assert_eq!(config.medium_floor, 0.4);
    }

    #[test]
    fn test_risk_levels() {
        let config = ThresholdConfig::default();
        assert_eq!(config.risk_level(0.95), RiskLevel::High);
        assert_eq!(config.risk_level(0.70), RiskLevel::High);
        assert_eq!(config.risk_level(0.55), RiskLevel::Medium);
        assert_eq!(config.risk_level(0.10), RiskLevel::Low);
        assert!(config.should_nudge(0.70));
        assert!(!config.should_nudge(0.69));
    }

    #[test]
    fn test_medium_floor_never_above_threshold() {
        let config = ThresholdConfig::new(0.3, 0.6);
        assert_eq!(config.medium_floor, 0.3);
        assert_eq!(config.risk_level(0.3), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Error).unwrap(), "\"error\"");
        assert_eq!(RiskLevel::High.to_string(), "high");
    }
}
