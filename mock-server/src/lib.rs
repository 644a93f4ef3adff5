//! In-memory stand-in for the nutrient prediction service.
//!
//! Serves the same routes as the real backend under `/api`, validates
//! requests the way it does, and keeps predictions in memory so history and
//! statistics have something to aggregate.

pub mod model;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

pub use model::{classify, FailingModel, Features, LinearModel, NutrientModel, NutrientValues, DEFAULT_CONFIDENCE};

/// A prediction as stored by the service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub ndvi: f64,
    pub chlorophyll: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub day_of_year: Option<i64>,
    pub predictions: NutrientValues,
    pub confidence: NutrientValues,
    pub field_id: String,
    pub notes: String,
}

impl StoredPrediction {
    fn status(&self) -> Value {
        json!({
            "nitrogen": classify("nitrogen", self.predictions.nitrogen),
            "phosphorus": classify("phosphorus", self.predictions.phosphorus),
            "potassium": classify("potassium", self.predictions.potassium),
        })
    }

    /// History representation, with inputs and outputs rounded for display.
    pub fn to_record(&self) -> Value {
        json!({
            "id": self.id,
            "inputs": {
                "ndvi": round_to(self.ndvi, 4),
                "chlorophyll": round_to(self.chlorophyll, 2),
                "latitude": self.latitude.map(|v| round_to(v, 4)),
                "longitude": self.longitude.map(|v| round_to(v, 4)),
                "day_of_year": self.day_of_year,
            },
            "predictions": {
                "nitrogen": round_to(self.predictions.nitrogen, 2),
                "phosphorus": round_to(self.predictions.phosphorus, 2),
                "potassium": round_to(self.predictions.potassium, 2),
            },
            "status": self.status(),
            "confidence": {
                "nitrogen": round_to(self.confidence.nitrogen, 4),
                "phosphorus": round_to(self.confidence.phosphorus, 4),
                "potassium": round_to(self.confidence.potassium, 4),
            },
            "created_at": isoformat(&self.created_at),
            "field_id": self.field_id,
            "notes": self.notes,
        })
    }
}

pub type Db = Arc<RwLock<Vec<StoredPrediction>>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub model: Arc<dyn NutrientModel>,
}

impl AppState {
    pub fn new(model: Arc<dyn NutrientModel>) -> Self {
        Self {
            db: Arc::new(RwLock::new(Vec::new())),
            model,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(LinearModel))
    }
}

pub fn app() -> Router {
    router(AppState::default())
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/history", get(history))
        .route("/statistics", get(statistics))
        .with_state(state);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

type Reply = (StatusCode, Json<Value>);

fn bad_request(message: impl Into<String>) -> Reply {
    let message = message.into();
    warn!(%message, "rejecting prediction request");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn server_error(message: impl Into<String>) -> Reply {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message.into(), "success": false })),
    )
}

/// Python-style `isoformat()` of a naive UTC timestamp.
fn isoformat(at: &DateTime<Utc>) -> String {
    at.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Start of a look-back window of `days` days, or an error reply when the
/// window reaches outside the representable calendar.
fn window_start(days: i64) -> Result<DateTime<Utc>, Reply> {
    Duration::try_days(days)
        .and_then(|span| Utc::now().checked_sub_signed(span))
        .ok_or_else(|| {
            error!(days, "look-back window out of range");
            server_error(format!("days out of range: {days}"))
        })
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Accept JSON numbers and numeric strings, like a lenient `float()`.
fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Accept integers, truncated floats, and integer strings, like `int()`.
fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn optional<T>(
    data: &Value,
    key: &str,
    coerce: fn(&Value) -> Option<T>,
) -> Result<Option<T>, String> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce(v)
            .map(Some)
            .ok_or_else(|| format!("Invalid input format: {key} must be numeric")),
    }
}

async fn health() -> Json<Value> {
    info!("health check");
    Json(json!({
        "status": "healthy",
        "message": "Backend is running",
        "timestamp": isoformat(&Utc::now()),
        "database": "connected",
    }))
}

async fn predict(State(state): State<AppState>, payload: Result<Json<Value>, JsonRejection>) -> Reply {
    let data = match payload {
        Ok(Json(data)) if data.as_object().is_some_and(|o| !o.is_empty()) => data,
        Ok(_) | Err(_) => return bad_request("No data provided"),
    };
    info!(%data, "received prediction request");

    if data.get("ndvi").is_none() || data.get("chlorophyll").is_none() {
        return bad_request("Missing required fields: ndvi, chlorophyll");
    }

    let Some(ndvi) = data.get("ndvi").and_then(coerce_f64) else {
        return bad_request("Invalid input format: ndvi must be numeric");
    };
    let Some(chlorophyll) = data.get("chlorophyll").and_then(coerce_f64) else {
        return bad_request("Invalid input format: chlorophyll must be numeric");
    };
    let features = match (
        optional(&data, "latitude", coerce_f64),
        optional(&data, "longitude", coerce_f64),
        optional(&data, "day_of_year", coerce_i64),
    ) {
        (Ok(latitude), Ok(longitude), Ok(day_of_year)) => Features {
            ndvi,
            chlorophyll,
            latitude,
            longitude,
            day_of_year,
        },
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return bad_request(e),
    };

    if !(0.0..=1.0).contains(&ndvi) {
        return bad_request("NDVI must be between 0 and 1");
    }
    if chlorophyll < 0.0 {
        return bad_request("Chlorophyll must be non-negative");
    }

    let predictions = match state.model.predict(&features) {
        Ok(values) => values,
        Err(reason) => {
            error!(%reason, "model prediction failed");
            return server_error(reason);
        }
    };

    let record = StoredPrediction {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        ndvi,
        chlorophyll,
        latitude: features.latitude,
        longitude: features.longitude,
        day_of_year: features.day_of_year,
        predictions,
        confidence: NutrientValues {
            nitrogen: DEFAULT_CONFIDENCE,
            phosphorus: DEFAULT_CONFIDENCE,
            potassium: DEFAULT_CONFIDENCE,
        },
        field_id: data
            .get("field_id")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string(),
        notes: data.get("notes").and_then(Value::as_str).unwrap_or_default().to_string(),
    };
    state.db.write().await.push(record.clone());
    info!(id = %record.id, "prediction stored");

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "prediction_id": record.id.to_string(),
            "timestamp": isoformat(&record.created_at),
            "inputs": { "ndvi": ndvi, "chlorophyll": chlorophyll },
            "predictions": record.predictions,
            "status": record.status(),
            "confidence": record.confidence,
            "message": "Prediction completed successfully",
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
    pub days: Option<i64>,
    pub field_id: Option<String>,
}

async fn history(State(state): State<AppState>, Query(params): Query<HistoryParams>) -> Reply {
    let limit = params.limit.unwrap_or(50);
    let days = params.days.unwrap_or(30);
    info!(limit, days, "history request");

    let since = match window_start(days) {
        Ok(since) => since,
        Err(reply) => return reply,
    };
    let db = state.db.read().await;
    let mut matching: Vec<&StoredPrediction> = db
        .iter()
        .filter(|p| p.created_at >= since)
        .filter(|p| params.field_id.as_deref().map_or(true, |f| p.field_id == f))
        .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching.truncate(limit);

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "count": matching.len(),
            "limit": limit,
            "days": days,
            "data": matching.iter().map(|p| p.to_record()).collect::<Vec<_>>(),
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    pub days: Option<i64>,
}

fn summarize(values: &[f64]) -> Value {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    json!({
        "mean": round_to(mean, 2),
        "min": round_to(min, 2),
        "max": round_to(max, 2),
        "std": round_to(variance.sqrt(), 2),
    })
}

async fn statistics(State(state): State<AppState>, Query(params): Query<StatisticsParams>) -> Reply {
    let days = params.days.unwrap_or(30);
    let since = match window_start(days) {
        Ok(since) => since,
        Err(reply) => return reply,
    };
    let db = state.db.read().await;
    let window: Vec<&StoredPrediction> = db.iter().filter(|p| p.created_at >= since).collect();

    if window.is_empty() {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "count": 0,
                "message": "No predictions in this period",
            })),
        );
    }

    let column = |pick: fn(&NutrientValues) -> f64| -> Vec<f64> {
        window.iter().map(|p| pick(&p.predictions)).collect()
    };
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "count": window.len(),
            "nitrogen": summarize(&column(|v| v.nitrogen)),
            "phosphorus": summarize(&column(|v| v.phosphorus)),
            "potassium": summarize(&column(|v| v.potassium)),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isoformat_has_no_offset() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(isoformat(&at), "2024-05-01T10:00:00.000000");
    }

    #[test]
    fn coercion_accepts_numeric_strings() {
        assert_eq!(coerce_f64(&json!("0.5")), Some(0.5));
        assert_eq!(coerce_f64(&json!(true)), None);
        assert_eq!(coerce_i64(&json!(150.9)), Some(150));
        assert_eq!(coerce_i64(&json!("150")), Some(150));
        assert_eq!(coerce_i64(&json!("150.5")), None);
    }

    #[test]
    fn window_start_rejects_unrepresentable_spans() {
        assert!(window_start(30).is_ok());
        assert!(window_start(-2).is_ok());
        let (status, Json(body)) = window_start(200_000_000).unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(window_start(i64::MAX).is_err());
    }

    #[test]
    fn summary_uses_population_std() {
        let s = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s["mean"], 5.0);
        assert_eq!(s["std"], 2.0);
        assert_eq!(s["min"], 2.0);
        assert_eq!(s["max"], 9.0);
    }

    #[test]
    fn stored_prediction_record_rounds_values() {
        let record = StoredPrediction {
            id: Uuid::nil(),
            created_at: Utc::now(),
            ndvi: 0.123456,
            chlorophyll: 35.555,
            latitude: None,
            longitude: Some(72.86971),
            day_of_year: Some(150),
            predictions: NutrientValues {
                nitrogen: 120.456,
                phosphorus: 30.0,
                potassium: 200.0,
            },
            confidence: NutrientValues {
                nitrogen: 0.85,
                phosphorus: 0.85,
                potassium: 0.85,
            },
            field_id: "FIELD_001".to_string(),
            notes: String::new(),
        };
        let value = record.to_record();
        assert_eq!(value["inputs"]["ndvi"], 0.1235);
        assert_eq!(value["inputs"]["longitude"], 72.8697);
        assert!(value["inputs"]["latitude"].is_null());
        assert_eq!(value["status"]["nitrogen"], "Adequate");
        assert_eq!(value["id"], "00000000-0000-0000-0000-000000000000");
    }
}
