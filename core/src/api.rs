//! Transport-driven facade over [`PredictionClient`].
//!
//! # Design
//! The `Transport` trait is the only place I/O happens. `Api` runs
//! build -> execute -> parse for each operation and converts every failure
//! into a [`RequestFailure`] with the operation's default message. The
//! health probe is the one operation that swallows failures.

use serde_json::Value;
use tracing::{info, warn};

use crate::client::PredictionClient;
use crate::error::{ApiError, RequestFailure, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{HealthStatus, HistoryQuery, MeasurementInput, PredictionResult, StatisticsQuery};

const PREDICT_DEFAULT: &str = "Prediction failed";
const HISTORY_DEFAULT: &str = "Failed to fetch history";
const STATISTICS_DEFAULT: &str = "Failed to fetch statistics";

/// Executes a plain-data request and returns the plain-data response.
///
/// Non-2xx statuses must come back as `Ok`; status interpretation belongs
/// to the client's parse methods.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// The client's single boundary to the prediction service.
#[derive(Debug, Clone)]
pub struct Api<T> {
    client: PredictionClient,
    transport: T,
}

impl<T: Transport> Api<T> {
    pub fn new(client: PredictionClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &PredictionClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn submit_prediction(&self, payload: &MeasurementInput) -> Result<PredictionResult, RequestFailure> {
        info!("submitting prediction");
        let result = self
            .client
            .build_predict(payload)
            .and_then(|req| self.round_trip(&req))
            .and_then(|resp| self.client.parse_predict(resp));
        finish(result, PREDICT_DEFAULT)
    }

    pub fn fetch_history(&self) -> Result<Value, RequestFailure> {
        self.fetch_history_with(&HistoryQuery::default())
    }

    pub fn fetch_history_with(&self, query: &HistoryQuery) -> Result<Value, RequestFailure> {
        let req = self.client.build_history(query);
        let result = self
            .round_trip(&req)
            .and_then(|resp| self.client.parse_history(resp));
        finish(result, HISTORY_DEFAULT)
    }

    pub fn fetch_statistics(&self) -> Result<Value, RequestFailure> {
        self.fetch_statistics_with(&StatisticsQuery::default())
    }

    pub fn fetch_statistics_with(&self, query: &StatisticsQuery) -> Result<Value, RequestFailure> {
        let req = self.client.build_statistics(query);
        let result = self
            .round_trip(&req)
            .and_then(|resp| self.client.parse_statistics(resp));
        finish(result, STATISTICS_DEFAULT)
    }

    /// Probe the liveness endpoint. Never fails.
    pub fn check_health(&self) -> HealthStatus {
        let req = self.client.build_health();
        match self.transport.execute(&req) {
            Ok(resp) => {
                let status = self.client.parse_health(resp);
                info!(status = %status.status, "health probe finished");
                status
            }
            Err(e) => {
                warn!(error = %e, "health probe could not reach backend");
                HealthStatus::unhealthy()
            }
        }
    }

    fn round_trip(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        info!(method = req.method.as_str(), url = %req.url, "sending request");
        let resp = self.transport.execute(req)?;
        info!(status = resp.status, "received response");
        Ok(resp)
    }
}

fn finish<V>(result: Result<V, ApiError>, default: &str) -> Result<V, RequestFailure> {
    result.map_err(|cause| {
        let failure = RequestFailure::new(cause, default);
        warn!(error = %failure.cause, message = %failure.message, "request failed");
        failure
    })
}
