//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the model input schema**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! The trained model reads features by position, so the order here must
//! match `feature_names` in the model metadata.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the model input
pub const FEATURE_LAYOUT: &[&str] = &[
    "distance_to_merchant",  // 0: km to the merchant
    "hour_of_day",           // 1: local hour, 0-23
    "is_weekend",            // 2: 1 on Saturday/Sunday
    "budget_utilization",    // 3: spent / budget, nominally 0-1
    "merchant_regret_rate",  // 4: share of regretted visits, 0-1
    "dwell_time",            // 5: seconds inside the region
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 6;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 of the version and the ordered feature names
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when a model's feature list doesn't match the layout
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMismatchError {
    pub position: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Feature layout mismatch at position {}: expected {:?}, got {:?}",
            self.position, self.expected, self.actual
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

/// Lowercase with separators removed, so `dwellTime` matches `dwell_time`
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Check a model's ordered feature names against the layout
pub fn validate_feature_names<S: AsRef<str>>(names: &[S]) -> Result<(), LayoutMismatchError> {
    let len = names.len().max(FEATURE_COUNT);

    for position in 0..len {
        let expected = FEATURE_LAYOUT.get(position);
        let actual = names.get(position).map(|s| s.as_ref());

        let matches = match (expected, actual) {
            (Some(e), Some(a)) => normalize_name(e) == normalize_name(a),
            _ => false,
        };

        if !matches {
            return Err(LayoutMismatchError {
                position,
                expected: expected.map(|s| s.to_string()),
                actual: actual.map(|s| s.to_string()),
            });
        }
    }

    Ok(())
}
