//! Model Module - On-device inference
//!
//! `inference` holds the engine trait and the ONNX implementation,
//! `adapter` is the boundary the event handler calls.

pub mod adapter;
pub mod inference;
pub mod threshold;

// Re-export common types
pub use adapter::{EngineStatus, InferenceAdapter};
pub use inference::{InferenceError, ModelMetadata, OnnxEngine, PredictionEngine, PredictionResult};
pub use threshold::{RiskLevel, ThresholdConfig};
