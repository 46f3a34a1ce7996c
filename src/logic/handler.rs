//! Geofence Event Handler
//!
//! Runs once per region transition, possibly in a process that was spawned
//! just for this event. Depends only on the event, the read-only zone
//! registry and configuration. Nothing escapes: every failure is logged and
//! reported as an `EventOutcome`.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::config::HeuristicConfig;
use crate::logic::cooldown::CooldownPolicy;
use crate::logic::features::PredictionInput;
use crate::logic::model::InferenceAdapter;
use crate::logic::notify::NotificationDispatcher;
use crate::logic::platform::{GeofenceEventType, TaskInvocation};
use crate::logic::zones::DangerZoneRegistry;

/// What one invocation ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Platform reported an error or delivered no data
    TaskError,
    IgnoredExit,
    UnknownRegion,
    InferenceUnavailable,
    BelowThreshold,
    CoolingDown,
    Nudged,
}

#[derive(Clone)]
pub struct GeofenceEventHandler {
    registry: Arc<DangerZoneRegistry>,
    inference: Arc<InferenceAdapter>,
    dispatcher: NotificationDispatcher,
    heuristics: HeuristicConfig,
    cooldown: CooldownPolicy,
}

impl GeofenceEventHandler {
    pub fn new(
        registry: Arc<DangerZoneRegistry>,
        inference: Arc<InferenceAdapter>,
        dispatcher: NotificationDispatcher,
        heuristics: HeuristicConfig,
        cooldown: CooldownPolicy,
    ) -> Self {
        Self { registry, inference, dispatcher, heuristics, cooldown }
    }

    /// Entry point for the raw background task callback
    pub async fn on_task(&self, invocation: TaskInvocation) -> EventOutcome {
        if let Some(error) = invocation.error {
            log::error!("Geofencing task error: {}", error);
            return EventOutcome::TaskError;
        }

        match invocation.data {
            Some(event) => self.on_event(event.event_type, &event.region_identifier).await,
            None => {
                log::warn!("No data received in geofencing task");
                EventOutcome::TaskError
            }
        }
    }

    /// Handle one transition using the current wall-clock time
    pub async fn on_event(&self, event_type: GeofenceEventType, region_identifier: &str) -> EventOutcome {
        self.on_event_at(event_type, region_identifier, Local::now()).await
    }

    pub async fn on_event_at(
        &self,
        event_type: GeofenceEventType,
        region_identifier: &str,
        now: DateTime<Local>,
    ) -> EventOutcome {
        log::info!("Geofencing event: {} {}", event_type, region_identifier);

        if event_type != GeofenceEventType::Enter {
            return EventOutcome::IgnoredExit;
        }

        let zone = match self.registry.find(region_identifier) {
            Ok(zone) => zone,
            Err(e) => {
                log::warn!("Zone not found for event: {}", e);
                return EventOutcome::UnknownRegion;
            }
        };

        let input = PredictionInput::for_zone_entry(zone, &now, &self.heuristics);
        log::info!("Running on-device prediction with features: {}", input.to_log_entry());

        let prediction = self.inference.predict(input).await;
        log::info!(
            "Prediction result: probability={:.3} risk={} nudge={}",
            prediction.probability, prediction.risk_level, prediction.should_nudge
        );

        if prediction.is_error() {
            log::warn!(
                "Inference unavailable for {}, skipping notification: {}",
                zone.merchant,
                prediction.error.as_deref().unwrap_or("unknown error")
            );
            return EventOutcome::InferenceUnavailable;
        }

        if !prediction.should_nudge {
            log::info!("Low risk at {}, no notification needed", zone.merchant);
            return EventOutcome::BelowThreshold;
        }

        let now_utc = now.with_timezone(&Utc);
        if self.cooldown.is_cooling_down(region_identifier, now_utc) {
            log::info!("Nudge for {} suppressed by re-notify interval", zone.merchant);
            return EventOutcome::CoolingDown;
        }

        if self.dispatcher.notify(&zone.merchant, prediction.probability, prediction.risk_level) {
            self.cooldown.record(region_identifier, now_utc);
        }
        EventOutcome::Nudged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::logic::config::ModelConfig;
    use crate::logic::model::RiskLevel;
    use crate::logic::platform::GeofenceEvent;
    use crate::logic::testing::{acme_registry, RecordingNotifier, StubEngine};

    struct Harness {
        handler: GeofenceEventHandler,
        engine: Arc<StubEngine>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(engine: StubEngine, cooldown: CooldownPolicy) -> Harness {
        harness_with(engine, Arc::new(RecordingNotifier::default()), cooldown)
    }

    fn harness_with(engine: StubEngine, notifier: Arc<RecordingNotifier>, cooldown: CooldownPolicy) -> Harness {
        let engine = Arc::new(engine);
        let inference = Arc::new(InferenceAdapter::with_engine(&ModelConfig::default(), engine.clone()));
        let handler = GeofenceEventHandler::new(
            Arc::new(acme_registry()),
            inference,
            NotificationDispatcher::new(notifier.clone()),
            HeuristicConfig::default(),
            cooldown,
        );
        Harness { handler, engine, notifier }
    }

    fn wednesday_night() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, 22, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_exit_never_runs_pipeline() {
        let h = harness(StubEngine::returning(0.95), CooldownPolicy::disabled());

        let outcome = h.handler.on_event(GeofenceEventType::Exit, "Acme_1_2").await;
        assert_eq!(outcome, EventOutcome::IgnoredExit);
        assert_eq!(h.engine.calls(), 0);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_region_has_no_side_effects() {
        let h = harness(StubEngine::returning(0.95), CooldownPolicy::disabled());

        let outcome = h.handler.on_event(GeofenceEventType::Enter, "Nowhere_0_0").await;
        assert_eq!(outcome, EventOutcome::UnknownRegion);
        assert_eq!(h.engine.calls(), 0);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_feature_vector_for_acme() {
        let h = harness(StubEngine::returning(0.1), CooldownPolicy::disabled());

        h.handler.on_event_at(GeofenceEventType::Enter, "Acme_1_2", wednesday_night()).await;

        let seen = h.engine.last_input().unwrap();
        let input = PredictionInput::from_array(seen);
        assert!((input.merchant_regret_rate - 0.40).abs() < 1e-6);
        assert_eq!(input.distance_to_merchant, 0.1);
        assert_eq!(input.dwell_time, 0.0);
        assert_eq!(input.hour_of_day, 22.0);
        assert_eq!(input.is_weekend, 0.0);
    }

    #[tokio::test]
    async fn test_error_result_never_notifies() {
        // Even an engine reporting a high score is ignored once the adapter rejects it
        let h = harness(StubEngine::returning(7.5), CooldownPolicy::disabled());

        let outcome = h.handler.on_event(GeofenceEventType::Enter, "Acme_1_2").await;
        assert_eq!(outcome, EventOutcome::InferenceUnavailable);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unloaded_model_never_notifies() {
        let h = harness(StubEngine::unloaded(), CooldownPolicy::disabled());

        let outcome = h.handler.on_event(GeofenceEventType::Enter, "Acme_1_2").await;
        assert_eq!(outcome, EventOutcome::InferenceUnavailable);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_high_risk_sends_exactly_one_notification() {
        let h = harness(StubEngine::returning(0.876), CooldownPolicy::disabled());

        let outcome = h.handler.on_event(GeofenceEventType::Enter, "Acme_1_2").await;
        assert_eq!(outcome, EventOutcome::Nudged);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("Acme"));
        assert!(sent[0].body.contains("88%"));
        assert_eq!(sent[0].data.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_low_risk_is_silent() {
        let h = harness(StubEngine::returning(0.2), CooldownPolicy::disabled());

        let outcome = h.handler.on_event(GeofenceEventType::Enter, "Acme_1_2").await;
        assert_eq!(outcome, EventOutcome::BelowThreshold);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reentry_notifies_again_without_cooldown() {
        let h = harness(StubEngine::returning(0.9), CooldownPolicy::disabled());

        h.handler.on_event(GeofenceEventType::Enter, "Acme_1_2").await;
        h.handler.on_event(GeofenceEventType::Enter, "Acme_1_2").await;

        assert_eq!(h.engine.calls(), 2);
        assert_eq!(h.notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_reentry() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(StubEngine::returning(0.9), CooldownPolicy::new(900, dir.path()));
        let first = wednesday_night();

        let a = h.handler.on_event_at(GeofenceEventType::Enter, "Acme_1_2", first).await;
        let b = h.handler.on_event_at(GeofenceEventType::Enter, "Acme_1_2", first + Duration::minutes(5)).await;
        let c = h.handler.on_event_at(GeofenceEventType::Enter, "Acme_1_2", first + Duration::minutes(20)).await;

        assert_eq!((a, b, c), (EventOutcome::Nudged, EventOutcome::CoolingDown, EventOutcome::Nudged));
        assert_eq!(h.notifier.sent().len(), 2);
        assert_eq!(h.engine.calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_notification_permission_is_swallowed() {
        let h = harness_with(
            StubEngine::returning(0.9),
            Arc::new(RecordingNotifier::rejecting()),
            CooldownPolicy::disabled(),
        );

        let outcome = h.handler.on_event(GeofenceEventType::Enter, "Acme_1_2").await;
        assert_eq!(outcome, EventOutcome::Nudged);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_task_invocation_errors() {
        let h = harness(StubEngine::returning(0.9), CooldownPolicy::disabled());

        let failed = TaskInvocation { data: None, error: Some("location services off".to_string()) };
        assert_eq!(h.handler.on_task(failed).await, EventOutcome::TaskError);
        assert_eq!(h.handler.on_task(TaskInvocation::default()).await, EventOutcome::TaskError);

        let enter = TaskInvocation {
            data: Some(GeofenceEvent {
                event_type: GeofenceEventType::Enter,
                region_identifier: "Acme_1_2".to_string(),
            }),
            error: None,
        };
        assert_eq!(h.handler.on_task(enter).await, EventOutcome::Nudged);
    }
}
