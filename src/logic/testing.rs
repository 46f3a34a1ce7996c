//! In-memory collaborators shared by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::logic::features::FEATURE_COUNT;
use crate::logic::model::{InferenceError, PredictionEngine};
use crate::logic::notify::NotificationRequest;
use crate::logic::platform::{
    GeofencingService, NotificationService, PermissionKind, PermissionService, PermissionStatus,
};
use crate::logic::zones::{DangerZone, DangerZoneRegistry, GeofenceRegion};

/// Registry with a single zone, identifier `Acme_1_2`, regret rate 0.40
pub fn acme_registry() -> DangerZoneRegistry {
    DangerZoneRegistry::from_zones(vec![DangerZone {
        merchant: "Acme".to_string(),
        lat: 1.0,
        lng: 2.0,
        regret_count: 40,
    }])
}

// ============================================================================
// ENGINE
// ============================================================================

enum StubBehavior {
    Return(f32),
    Fail,
    Panic,
}

pub struct StubEngine {
    behavior: StubBehavior,
    loaded: bool,
    threshold: Option<f32>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_input: Mutex<Option<[f32; FEATURE_COUNT]>>,
}

impl StubEngine {
    fn with_behavior(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            loaded: true,
            threshold: None,
            delay: None,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    pub fn returning(probability: f32) -> Self {
        Self::with_behavior(StubBehavior::Return(probability))
    }

    pub fn failing() -> Self {
        Self::with_behavior(StubBehavior::Fail)
    }

    pub fn panicking() -> Self {
        Self::with_behavior(StubBehavior::Panic)
    }

    pub fn unloaded() -> Self {
        Self { loaded: false, ..Self::returning(0.99) }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<[f32; FEATURE_COUNT]> {
        *self.last_input.lock()
    }
}

impl PredictionEngine for StubEngine {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn model_type(&self) -> &str {
        "stub"
    }

    fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    fn predict_probability(&self, features: &[f32; FEATURE_COUNT]) -> Result<f32, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock() = Some(*features);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match self.behavior {
            StubBehavior::Return(p) => Ok(p),
            StubBehavior::Fail => Err(InferenceError::Runtime("stub failure".to_string())),
            StubBehavior::Panic => panic!("stub engine panicked"),
        }
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

pub struct RecordingNotifier {
    accept: bool,
    sent: Mutex<Vec<NotificationRequest>>,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self { accept: true, sent: Mutex::new(Vec::new()) }
    }
}

impl RecordingNotifier {
    /// Behaves like a device without notification permission
    pub fn rejecting() -> Self {
        Self { accept: false, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().clone()
    }
}

impl NotificationService for RecordingNotifier {
    fn present(&self, request: &NotificationRequest) -> Result<(), String> {
        if !self.accept {
            return Err("notification permission not granted".to_string());
        }
        self.sent.lock().push(request.clone());
        Ok(())
    }
}

// ============================================================================
// PERMISSIONS
// ============================================================================

/// Every permission starts undetermined; the first request answers from the script
pub struct ScriptedPermissions {
    answers: HashMap<PermissionKind, bool>,
    state: Mutex<HashMap<PermissionKind, PermissionStatus>>,
    requested: Mutex<Vec<PermissionKind>>,
    prompts: AtomicUsize,
}

impl ScriptedPermissions {
    pub fn answering(foreground: bool, background: bool, notifications: bool) -> Self {
        let answers = HashMap::from([
            (PermissionKind::ForegroundLocation, foreground),
            (PermissionKind::BackgroundLocation, background),
            (PermissionKind::Notifications, notifications),
        ]);
        Self {
            answers,
            state: Mutex::new(HashMap::new()),
            requested: Mutex::new(Vec::new()),
            prompts: AtomicUsize::new(0),
        }
    }

    /// Everything already granted, no prompt will ever be shown
    pub fn granted() -> Self {
        let scripted = Self::answering(true, true, true);
        {
            let mut state = scripted.state.lock();
            for kind in PermissionKind::ALL {
                state.insert(kind, PermissionStatus::Granted);
            }
        }
        scripted
    }

    pub fn requested(&self) -> Vec<PermissionKind> {
        self.requested.lock().clone()
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionService for ScriptedPermissions {
    async fn status(&self, kind: PermissionKind) -> Result<PermissionStatus, String> {
        Ok(self.state.lock().get(&kind).copied().unwrap_or_default())
    }

    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus, String> {
        self.requested.lock().push(kind);

        let mut state = self.state.lock();
        let current = state.get(&kind).copied().unwrap_or_default();
        if current != PermissionStatus::Undetermined {
            return Ok(current);
        }

        self.prompts.fetch_add(1, Ordering::SeqCst);
        let answer = if self.answers.get(&kind).copied().unwrap_or(false) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        state.insert(kind, answer);
        Ok(answer)
    }
}

// ============================================================================
// GEOFENCING
// ============================================================================

pub struct FakeGeofencing {
    supported: bool,
    tasks: Mutex<HashMap<String, Vec<GeofenceRegion>>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    fail_queries: AtomicBool,
}

impl Default for FakeGeofencing {
    fn default() -> Self {
        Self {
            supported: true,
            tasks: Mutex::new(HashMap::new()),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            fail_queries: AtomicBool::new(false),
        }
    }
}

impl FakeGeofencing {
    pub fn unsupported() -> Self {
        Self { supported: false, ..Self::default() }
    }

    pub fn regions(&self, task: &str) -> Option<Vec<GeofenceRegion>> {
        self.tasks.lock().get(task).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl GeofencingService for FakeGeofencing {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn start_geofencing(&self, task: &str, regions: &[GeofenceRegion]) -> Result<(), String> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().insert(task.to_string(), regions.to_vec());
        Ok(())
    }

    async fn stop_geofencing(&self, task: &str) -> Result<(), String> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().remove(task);
        Ok(())
    }

    async fn is_task_registered(&self, task: &str) -> Result<bool, String> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err("task manager unavailable".to_string());
        }
        Ok(self.tasks.lock().contains_key(task))
    }
}
