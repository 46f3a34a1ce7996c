//! Inference Adapter
//!
//! Boundary between the event handler and the embedded engine. Nothing
//! raises past it: every failure becomes a `RiskLevel::Error` result.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::constants;
use crate::logic::config::ModelConfig;
use crate::logic::features::PredictionInput;
use super::inference::{InferenceError, OnnxEngine, PredictionEngine, PredictionResult};
use super::threshold::ThresholdConfig;

/// Engine status for the control surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_type: Option<String>,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
}

pub struct InferenceAdapter {
    engine: RwLock<Option<Arc<dyn PredictionEngine>>>,
    medium_floor: f32,
    timeout: Duration,
    /// Call abandoned by a timeout. It still holds the engine session.
    abandoned: Mutex<Option<JoinHandle<Result<f32, InferenceError>>>>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl InferenceAdapter {
    /// Adapter with no engine loaded
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            engine: RwLock::new(None),
            medium_floor: config.medium_floor,
            timeout: Duration::from_millis(config.inference_timeout_ms),
            abandoned: Mutex::new(None),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn with_engine(config: &ModelConfig, engine: Arc<dyn PredictionEngine>) -> Self {
        let adapter = Self::new(config);
        adapter.set_engine(engine);
        adapter
    }

    pub fn set_engine(&self, engine: Arc<dyn PredictionEngine>) {
        *self.engine.write() = Some(engine);
    }

    /// Load the ONNX model and make it the active engine
    pub fn load_onnx(&self, model_path: &Path, metadata_path: &Path) -> Result<(), InferenceError> {
        let engine = OnnxEngine::load(model_path, metadata_path)?;
        self.set_engine(Arc::new(engine));
        Ok(())
    }

    pub fn unload(&self) {
        *self.engine.write() = None;
        log::info!("Prediction model unloaded");
    }

    /// Synchronous readiness check
    pub fn is_model_loaded(&self) -> bool {
        self.engine.read().as_ref().map(|e| e.is_loaded()).unwrap_or(false)
    }

    /// Score one feature vector on-device, bounded by the configured timeout
    pub async fn predict(&self, input: PredictionInput) -> PredictionResult {
        let engine = self.engine.read().clone();
        let engine = match engine {
            Some(engine) if engine.is_loaded() => engine,
            _ => return PredictionResult::error("Model not loaded"),
        };

        if let Err(reason) = input.validate() {
            return PredictionResult::error(format!("Input rejected: {}", reason));
        }

        {
            let mut abandoned = self.abandoned.lock();
            if abandoned.as_ref().is_some_and(|handle| !handle.is_finished()) {
                return PredictionResult::error("Previous inference still running");
            }
            *abandoned = None;
        }

        let features = input.to_array();
        let start_time = Instant::now();
        let mut scoring = {
            let engine = Arc::clone(&engine);
            tokio::task::spawn_blocking(move || engine.predict_probability(&features))
        };

        let probability = match tokio::time::timeout(self.timeout, &mut scoring).await {
            Err(_) => {
                // Blocking work cannot be cancelled; later calls fail fast until it returns
                *self.abandoned.lock() = Some(scoring);
                return PredictionResult::error(format!("Inference timed out after {:?}", self.timeout));
            }
            Ok(Err(join_error)) => {
                return PredictionResult::error(format!("Inference task failed: {}", join_error));
            }
            Ok(Ok(Err(e))) => return PredictionResult::error(e.to_string()),
            Ok(Ok(Ok(probability))) => probability,
        };

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return PredictionResult::error(format!("Probability {} outside 0..1", probability));
        }

        let elapsed_us = start_time.elapsed().as_micros() as u64;
        self.latency_sum_us.fetch_add(elapsed_us, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        log::debug!("Inference took {} us", elapsed_us);

        let thresholds = ThresholdConfig::new(
            engine.threshold().unwrap_or(constants::DEFAULT_NUDGE_THRESHOLD),
            self.medium_floor,
        );
        PredictionResult::from_probability(probability, &thresholds, engine.model_type())
    }

    pub fn status(&self) -> EngineStatus {
        let engine = self.engine.read().clone();
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_loaded: engine.as_ref().map(|e| e.is_loaded()).unwrap_or(false),
            model_type: engine.map(|e| e.model_type().to_string()),
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}
