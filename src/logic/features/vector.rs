//! Prediction Input - the 6-feature vector fed to the model
//!
//! Field order follows `FEATURE_LAYOUT`. Background evaluations build it from
//! a danger zone, the wall clock and the heuristic constants in
//! `HeuristicConfig`, since live distance and budget state are not
//! available there.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::logic::config::HeuristicConfig;
use crate::logic::zones::DangerZone;
use super::layout::{layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub distance_to_merchant: f32,
    pub hour_of_day: f32,
    pub is_weekend: f32,
    pub budget_utilization: f32,
    pub merchant_regret_rate: f32,
    pub dwell_time: f32,
}

impl PredictionInput {
    /// Feature vector for a zone that was just entered
    pub fn for_zone_entry<Tz: TimeZone>(
        zone: &DangerZone,
        now: &DateTime<Tz>,
        heuristics: &HeuristicConfig,
    ) -> Self {
        let is_weekend = matches!(now.weekday(), Weekday::Sat | Weekday::Sun);

        Self {
            distance_to_merchant: heuristics.distance_to_merchant,
            hour_of_day: now.hour() as f32,
            is_weekend: if is_weekend { 1.0 } else { 0.0 },
            budget_utilization: heuristics.budget_utilization,
            merchant_regret_rate: heuristics.regret_rate(zone.regret_count),
            dwell_time: heuristics.dwell_time,
        }
    }

    /// Values in layout order
    pub fn to_array(&self) -> [f32; FEATURE_COUNT] {
        [
            self.distance_to_merchant,
            self.hour_of_day,
            self.is_weekend,
            self.budget_utilization,
            self.merchant_regret_rate,
            self.dwell_time,
        ]
    }

    pub fn from_array(values: [f32; FEATURE_COUNT]) -> Self {
        Self {
            distance_to_merchant: values[0],
            hour_of_day: values[1],
            is_weekend: values[2],
            budget_utilization: values[3],
            merchant_regret_rate: values[4],
            dwell_time: values[5],
        }
    }

    /// Check every value lies in the domain the model was trained on
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in FEATURE_LAYOUT.iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(format!("{} is not finite", name));
            }
        }

        if self.distance_to_merchant < 0.0 {
            return Err("distance_to_merchant is negative".to_string());
        }
        if !(0.0..=23.0).contains(&self.hour_of_day) || self.hour_of_day.fract() != 0.0 {
            return Err(format!("hour_of_day {} outside 0..23", self.hour_of_day));
        }
        if self.is_weekend != 0.0 && self.is_weekend != 1.0 {
            return Err(format!("is_weekend {} is not 0 or 1", self.is_weekend));
        }
        if self.budget_utilization < 0.0 {
            return Err("budget_utilization is negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.merchant_regret_rate) {
            return Err(format!("merchant_regret_rate {} outside 0..1", self.merchant_regret_rate));
        }
        if self.dwell_time < 0.0 {
            return Err("dwell_time is negative".to_string());
        }

        Ok(())
    }

    /// JSON form for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": FEATURE_VERSION,
            "layout_hash": layout_hash(),
            "values": FEATURE_LAYOUT.iter()
                .zip(self.to_array().iter())
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn acme() -> DangerZone {
        DangerZone { merchant: "Acme".to_string(), lat: 1.0, lng: 2.0, regret_count: 40 }
    }

    #[test]
    fn test_zone_entry_heuristics() {
        let tz = FixedOffset::east_opt(0).unwrap();
        // 2024-06-12 is a Wednesday
        let now = tz.with_ymd_and_hms(2024, 6, 12, 22, 15, 0).unwrap();

        let input = PredictionInput::for_zone_entry(&acme(), &now, &HeuristicConfig::default());

        assert!((input.merchant_regret_rate - 0.40).abs() < 1e-6);
        assert_eq!(input.distance_to_merchant, 0.1);
        assert_eq!(input.dwell_time, 0.0);
        assert_eq!(input.budget_utilization, 0.75);
        assert_eq!(input.hour_of_day, 22.0);
        assert_eq!(input.is_weekend, 0.0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_weekend_flag() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let saturday = tz.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        let sunday = tz.with_ymd_and_hms(2024, 6, 16, 0, 30, 0).unwrap();

        let heuristics = HeuristicConfig::default();
        assert_eq!(PredictionInput::for_zone_entry(&acme(), &saturday, &heuristics).is_weekend, 1.0);
        let sun = PredictionInput::for_zone_entry(&acme(), &sunday, &heuristics);
        assert_eq!(sun.is_weekend, 1.0);
        assert_eq!(sun.hour_of_day, 0.0);
    }

    #[test]
    fn test_regret_rate_clamped() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
        let zone = DangerZone { regret_count: 250, ..acme() };

        let input = PredictionInput::for_zone_entry(&zone, &now, &HeuristicConfig::default());
        assert_eq!(input.merchant_regret_rate, 1.0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_array_order_matches_layout() {
        let values = [0.1, 14.0, 1.0, 0.5, 0.3, 12.0];
        let input = PredictionInput::from_array(values);
        assert_eq!(input.to_array(), values);
        assert_eq!(input.hour_of_day, 14.0);
        assert_eq!(input.dwell_time, 12.0);
    }

    #[test]
    fn test_validate_rejects_out_of_domain() {
        let good = PredictionInput::from_array([0.1, 14.0, 1.0, 0.5, 0.3, 0.0]);
        assert!(good.validate().is_ok());

        assert!(PredictionInput { hour_of_day: 24.0, ..good }.validate().is_err());
        assert!(PredictionInput { is_weekend: 0.5, ..good }.validate().is_err());
        assert!(PredictionInput { merchant_regret_rate: 1.2, ..good }.validate().is_err());
        assert!(PredictionInput { dwell_time: -1.0, ..good }.validate().is_err());
        assert!(PredictionInput { budget_utilization: f32::NAN, ..good }.validate().is_err());
    }

    #[test]
    fn test_to_log_entry() {
        let input = PredictionInput::from_array([0.1, 14.0, 1.0, 0.5, 0.3, 0.0]);
        let log = input.to_log_entry();
        assert_eq!(log["feature_version"], FEATURE_VERSION);
        assert!(log["layout_hash"].as_u64().is_some());
        assert!(log["values"]["hour_of_day"].as_f64().is_some());
    }
}
