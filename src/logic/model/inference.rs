//! Inference Engine - ONNX Runtime Integration
//!
//! Loads the purchase-regret model and its metadata sidecar and scores one
//! feature vector at a time. Everything runs on-device.

use std::fs;
use std::path::Path;

use ndarray::Array2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;

use crate::logic::features::layout::{validate_feature_names, FEATURE_COUNT};
use super::threshold::{RiskLevel, ThresholdConfig};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Metadata written next to the model by the training job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub threshold: Option<f32>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Hex SHA-256 of the model file
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Prediction output handed to the event handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub probability: f32,
    pub should_nudge: bool,
    pub risk_level: RiskLevel,
    pub threshold: f32,
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    pub fn from_probability(probability: f32, thresholds: &ThresholdConfig, model_type: &str) -> Self {
        Self {
            probability,
            should_nudge: thresholds.should_nudge(probability),
            risk_level: thresholds.risk_level(probability),
            threshold: thresholds.nudge_threshold,
            model_type: Some(model_type.to_string()),
            error: None,
        }
    }

    /// "No signal" result. Never to be read as low risk.
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            probability: 0.0,
            should_nudge: false,
            risk_level: RiskLevel::Error,
            threshold: 0.0,
            model_type: None,
            error: Some(reason.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.risk_level == RiskLevel::Error
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("invalid model metadata: {0}")]
    Metadata(String),

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("inference failed: {0}")]
    Runtime(String),
}

// ============================================================================
// INFERENCE ENGINE TRAIT
// ============================================================================

/// Embedded prediction engine
pub trait PredictionEngine: Send + Sync {
    fn is_loaded(&self) -> bool;

    fn model_type(&self) -> &str;

    /// Nudge threshold shipped with the model, if any
    fn threshold(&self) -> Option<f32>;

    /// Probability of a regretted purchase for one feature vector
    fn predict_probability(&self, features: &[f32; FEATURE_COUNT]) -> Result<f32, InferenceError>;
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

/// Output holding class probabilities in converted classifiers
const PROBABILITY_OUTPUT: &str = "probabilities";

pub struct OnnxEngine {
    session: Mutex<Session>,
    metadata: ModelMetadata,
    output_name: String,
}

impl OnnxEngine {
    /// Load model + metadata sidecar, verifying layout and checksum
    pub fn load(model_path: &Path, metadata_path: &Path) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(InferenceError::ModelNotFound(model_path.display().to_string()));
        }

        let metadata = load_metadata(metadata_path)?;
        let model_bytes = fs::read(model_path)
            .map_err(|e| InferenceError::ModelNotFound(format!("{}: {}", model_path.display(), e)))?;

        if let Some(expected) = &metadata.sha256 {
            verify_checksum(&model_bytes, expected)?;
        }

        Self::from_bytes(&model_bytes, metadata)
    }

    /// Load from memory with already-parsed metadata
    pub fn from_bytes(model_bytes: &[u8], metadata: ModelMetadata) -> Result<Self, InferenceError> {
        if !metadata.feature_names.is_empty() {
            validate_feature_names(&metadata.feature_names)
                .map_err(|e| InferenceError::Metadata(e.to_string()))?;
        }

        let session = Session::builder()
            .map_err(|e| InferenceError::Runtime(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Runtime(format!("Failed to set optimization: {}", e)))?
            .commit_from_memory(model_bytes)
            .map_err(|e| InferenceError::Runtime(format!("Failed to load model: {}", e)))?;

        let output_name = session.outputs.iter()
            .find(|o| o.name == PROBABILITY_OUTPUT)
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError::Runtime("No output defined".to_string()))?;

        log::info!(
            "ONNX model loaded ({} bytes, type {}, output '{}')",
            model_bytes.len(), metadata.model_type, output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            metadata,
            output_name,
        })
    }
}

impl PredictionEngine for OnnxEngine {
    fn is_loaded(&self) -> bool {
        true
    }

    fn model_type(&self) -> &str {
        &self.metadata.model_type
    }

    fn threshold(&self) -> Option<f32> {
        self.metadata.threshold
    }

    fn predict_probability(&self, features: &[f32; FEATURE_COUNT]) -> Result<f32, InferenceError> {
        let input_array = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), features.to_vec())
            .map_err(|e| InferenceError::Runtime(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError::Runtime(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs.get(&self.output_name)
            .ok_or_else(|| InferenceError::Runtime("No output".to_string()))?;

        let output_tensor = output.try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Runtime(format!("Extract error: {}", e)))?;

        positive_class_probability(output_tensor.1)
    }
}

/// `[p]` for a single-score model, `[p_neg, p_pos]` for a two-class classifier
fn positive_class_probability(data: &[f32]) -> Result<f32, InferenceError> {
    match data {
        [p] | [_, p] => Ok(*p),
        other => Err(InferenceError::Runtime(format!(
            "Unexpected output shape: {} values", other.len()
        ))),
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn load_metadata(path: &Path) -> Result<ModelMetadata, InferenceError> {
    let content = fs::read_to_string(path)
        .map_err(|e| InferenceError::Metadata(format!("{}: {}", path.display(), e)))?;
    let metadata: ModelMetadata = serde_json::from_str(&content)
        .map_err(|e| InferenceError::Metadata(format!("{}: {}", path.display(), e)))?;

    if let Some(threshold) = metadata.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(InferenceError::Metadata(format!("threshold {} outside 0..1", threshold)));
        }
    }

    Ok(metadata)
}

/// Compare the SHA-256 of `bytes` with a hex digest
pub fn verify_checksum(bytes: &[u8], expected_hex: &str) -> Result<(), InferenceError> {
    let actual = hex::encode(Sha256::digest(bytes));
    if actual.eq_ignore_ascii_case(expected_hex.trim()) {
        Ok(())
    } else {
        Err(InferenceError::ChecksumMismatch {
            expected: expected_hex.trim().to_lowercase(),
            actual,
        })
    }
}
