//! Notification Dispatcher
//!
//! Builds the spending alert and hands it to the platform. Enqueue only:
//! delivery is never awaited and failures never reach the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::model::RiskLevel;
use crate::logic::platform::NotificationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Default,
    High,
}

/// Structured payload for downstream handling of the alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgePayload {
    pub zone: String,
    pub probability: f32,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub data: NudgePayload,
    pub sound: Option<String>,
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
}

impl NotificationRequest {
    pub fn nudge(merchant: &str, probability: f32, risk_level: RiskLevel) -> Self {
        let percent = (probability * 100.0).round() as i32;

        Self {
            id: Uuid::new_v4(),
            title: "⚠️ Spending Alert".to_string(),
            body: format!(
                "You're near {}, a danger zone. {}% chance you'll regret this purchase.",
                merchant, percent
            ),
            data: NudgePayload {
                zone: merchant.to_string(),
                probability,
                risk_level,
            },
            sound: Some("default".to_string()),
            priority: NotificationPriority::High,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    service: Arc<dyn NotificationService>,
}

impl NotificationDispatcher {
    pub fn new(service: Arc<dyn NotificationService>) -> Self {
        Self { service }
    }

    /// Fire-and-forget. Returns whether the platform accepted the request.
    pub fn notify(&self, merchant: &str, probability: f32, risk_level: RiskLevel) -> bool {
        let request = NotificationRequest::nudge(merchant, probability, risk_level);

        match self.service.present(&request) {
            Ok(()) => {
                log::info!("Notification sent for high-risk zone: {}", merchant);
                true
            }
            Err(e) => {
                log::warn!("Notification for {} not delivered: {}", merchant, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::testing::RecordingNotifier;

    #[test]
    fn test_nudge_body_has_merchant_and_rounded_percent() {
        let request = NotificationRequest::nudge("The Dive Bar", 0.876, RiskLevel::High);

        assert_eq!(request.title, "⚠️ Spending Alert");
        assert!(request.body.contains("The Dive Bar"));
        assert!(request.body.contains("88%"));
        assert_eq!(request.priority, NotificationPriority::High);
        assert_eq!(request.sound.as_deref(), Some("default"));
    }

    #[test]
    fn test_payload_keys() {
        let request = NotificationRequest::nudge("Acme", 0.5, RiskLevel::Medium);
        let json = serde_json::to_value(&request.data).unwrap();

        assert_eq!(json["zone"], "Acme");
        assert_eq!(json["riskLevel"], "medium");
        assert!(json["probability"].as_f64().is_some());
    }

    #[test]
    fn test_dispatch_records_request() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = NotificationDispatcher::new(notifier.clone());

        assert!(dispatcher.notify("Acme", 0.91, RiskLevel::High));

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data.zone, "Acme");
    }

    #[test]
    fn test_rejected_enqueue_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier::rejecting());
        let dispatcher = NotificationDispatcher::new(notifier.clone());

        assert!(!dispatcher.notify("Acme", 0.91, RiskLevel::High));
        assert!(notifier.sent().is_empty());
    }
}
