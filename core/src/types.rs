//! Wire DTOs for the nutrient prediction API.
//!
//! # Design
//! These types mirror the prediction service's JSON but are defined
//! independently from the mock-server crate; integration tests catch schema
//! drift. Response types keep every section optional and collect unknown keys
//! in `extra`, so a body is handed back to callers unchanged. A 2xx body never
//! fails to decode because of an unexpected section shape.

use std::collections::BTreeMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Outbound body for `POST /predict`. Optional fields that were left empty
/// are omitted from the JSON entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementInput {
    pub ndvi: f64,
    pub chlorophyll: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MeasurementInput {
    pub fn new(ndvi: f64, chlorophyll: f64) -> Self {
        Self {
            ndvi,
            chlorophyll,
            latitude: None,
            longitude: None,
            day_of_year: None,
            field_id: None,
            notes: None,
        }
    }
}

/// The three nutrients the service estimates, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl Nutrient {
    pub const ALL: [Nutrient; 3] = [Nutrient::Nitrogen, Nutrient::Phosphorus, Nutrient::Potassium];

    /// Key used for this nutrient in every response section.
    pub fn key(self) -> &'static str {
        match self {
            Nutrient::Nitrogen => "nitrogen",
            Nutrient::Phosphorus => "phosphorus",
            Nutrient::Potassium => "potassium",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Nitrogen => "Nitrogen",
            Nutrient::Phosphorus => "Phosphorus",
            Nutrient::Potassium => "Potassium",
        }
    }
}

/// Response body of `POST /predict`.
///
/// Only the `success` flag and the `error` text are interpreted here. The
/// nutrient sections, the id and the timestamp are kept as the service sent
/// them; their shape is checked when the record is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(default, deserialize_with = "true_only")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, deserialize_with = "text_only", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PredictionResult {
    /// One nutrient's entry in a section, if both are present.
    pub fn entry(section: Option<&Value>, nutrient: Nutrient) -> Option<&Value> {
        section.and_then(|s| s.get(nutrient.key()))
    }
}

// Anything but a literal `true` is a failed prediction.
fn true_only<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn text_only<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Response body of `GET /health`. Anything other than `"healthy"` counts as
/// down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl HealthStatus {
    pub const HEALTHY: &'static str = "healthy";
    pub const UNHEALTHY: &'static str = "unhealthy";

    /// Sentinel returned whenever the probe fails for any reason.
    pub fn unhealthy() -> Self {
        Self {
            status: Self::UNHEALTHY.to_string(),
            extra: BTreeMap::new(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == Self::HEALTHY
    }
}

/// Query for `GET /history`. The default is the most recent 50 entries within
/// the last 30 days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: u32,
    pub days: u32,
    pub field_id: Option<String>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            days: 30,
            field_id: None,
        }
    }
}

/// Query for `GET /statistics`, aggregated over the last 30 days by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsQuery {
    pub days: u32,
}

impl Default for StatisticsQuery {
    fn default() -> Self {
        Self { days: 30 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_with_only_required_fields_has_two_keys() {
        let json = serde_json::to_value(MeasurementInput::new(0.75, 35.5)).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(json["ndvi"], 0.75);
        assert_eq!(json["chlorophyll"], 35.5);
    }

    #[test]
    fn prediction_result_keeps_unknown_keys() {
        let body = r#"{"success":true,"prediction_id":7,"message":"done","inputs":{"ndvi":0.5}}"#;
        let result: PredictionResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.prediction_id, Some(Value::from(7)));
        assert_eq!(result.extra["message"], "done");

        let back: Value = serde_json::to_value(&result).unwrap();
        let original: Value = serde_json::from_str(body).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn odd_section_shapes_still_decode() {
        let body = r#"{"success":true,"prediction_id":-5,"timestamp":1714557600,
            "predictions":{"nitrogen":1.0,"phosphorus":2.0},"status":"pending","error":404}"#;
        let result: PredictionResult = serde_json::from_str(body).unwrap();
        assert!(result.success);
        assert_eq!(result.prediction_id, Some(Value::from(-5)));
        assert_eq!(result.timestamp, Some(Value::from(1714557600)));
        assert!(PredictionResult::entry(result.predictions.as_ref(), Nutrient::Potassium).is_none());
        assert_eq!(
            PredictionResult::entry(result.predictions.as_ref(), Nutrient::Phosphorus),
            Some(&Value::from(2.0))
        );
        assert!(PredictionResult::entry(result.status.as_ref(), Nutrient::Nitrogen).is_none());
        assert_eq!(result.error, None);
    }

    #[test]
    fn missing_success_flag_reads_as_false() {
        let result: PredictionResult = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));

        let result: PredictionResult = serde_json::from_str(r#"{"success":"true"}"#).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn health_sentinel_is_not_healthy() {
        assert!(!HealthStatus::unhealthy().is_healthy());
        let ok: HealthStatus = serde_json::from_str(r#"{"status":"healthy","database":"connected"}"#).unwrap();
        assert!(ok.is_healthy());
    }

    #[test]
    fn nutrient_keys_follow_display_order() {
        let keys: Vec<&str> = Nutrient::ALL.iter().map(|n| n.key()).collect();
        assert_eq!(keys, vec!["nitrogen", "phosphorus", "potassium"]);
    }
}
