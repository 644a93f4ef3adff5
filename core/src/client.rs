//! Stateless HTTP request builder and response parser for the prediction API.
//!
//! # Design
//! `PredictionClient` holds only a `base_url` and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The caller executes the actual HTTP round-trip.
//!
//! Every JSON endpoint answers with an envelope carrying a `success` flag.
//! Parsing treats `success` other than `true` as a failure even on a 2xx
//! status, so callers see one failure path for transport errors, bad
//! statuses and application-level rejections alike.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{HealthStatus, HistoryQuery, MeasurementInput, PredictionResult, StatisticsQuery};

/// Base address of a locally running prediction service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Synchronous, stateless client for the prediction API.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    base_url: String,
}

impl Default for PredictionClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl PredictionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_predict(&self, input: &MeasurementInput) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        debug!(%body, "building prediction request");
        Ok(self.request(HttpMethod::Post, "/predict", Some(body)))
    }

    pub fn build_history(&self, query: &HistoryQuery) -> HttpRequest {
        let mut path = format!("/history?limit={}&days={}", query.limit, query.days);
        if let Some(field_id) = &query.field_id {
            path.push_str("&field_id=");
            path.push_str(&encode_query_value(field_id));
        }
        self.request(HttpMethod::Get, &path, None)
    }

    pub fn build_statistics(&self, query: &StatisticsQuery) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/statistics?days={}", query.days), None)
    }

    pub fn build_health(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/health", None)
    }

    pub fn parse_predict(&self, response: HttpResponse) -> Result<PredictionResult, ApiError> {
        let envelope = parse_envelope(response)?;
        serde_json::from_value(envelope).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// History records are passed through as raw JSON.
    pub fn parse_history(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_envelope(response)
    }

    pub fn parse_statistics(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_envelope(response)
    }

    /// Never fails: anything but a 2xx JSON body with a `status` field reads
    /// as the unhealthy sentinel.
    pub fn parse_health(&self, response: HttpResponse) -> HealthStatus {
        if !response.is_success() {
            warn!(status = response.status, "health probe returned non-success status");
            return HealthStatus::unhealthy();
        }
        serde_json::from_str(&response.body).unwrap_or_else(|e| {
            warn!(error = %e, "health probe returned malformed body");
            HealthStatus::unhealthy()
        })
    }

    fn request(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body,
            with_credentials: true,
        }
    }
}

/// Check the status, decode JSON, and enforce the `success` flag.
fn parse_envelope(response: HttpResponse) -> Result<Value, ApiError> {
    debug!(status = response.status, "parsing response");
    if !response.is_success() {
        let message = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|v| error_field(&v));
        return Err(ApiError::Http {
            status: response.status,
            message,
            body: response.body,
        });
    }

    let value: Value =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    if value.get("success").and_then(Value::as_bool) != Some(true) {
        return Err(ApiError::Rejected {
            message: error_field(&value),
            payload: value,
        });
    }
    Ok(value)
}

fn error_field(value: &Value) -> Option<String> {
    value.get("error").and_then(Value::as_str).map(str::to_string)
}

/// Everything except RFC 3986 unreserved characters is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

fn encode_query_value(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_VALUE).to_string()
}
