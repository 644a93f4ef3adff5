//! Error types for the prediction API client.
//!
//! # Design
//! `ApiError` keeps the precise cause for logs and tests. Callers that only
//! want something to show a user go through [`ApiError::user_message`], which
//! collapses every cause into one string: the server's own `error` field when
//! it sent one, else the transport's message, else a per-operation default.

use serde_json::Value;
use thiserror::Error;

use crate::types::PredictionResult;

/// The request never produced an HTTP response (DNS, refused connection,
/// reset, TLS, timeout).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Errors returned by `PredictionClient` parse methods and by transports.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status. `message` is the body's
    /// `error` field when the body was JSON and carried one.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or(body.as_str()))]
    Http {
        status: u16,
        message: Option<String>,
        body: String,
    },

    /// A 2xx response whose `success` flag was not `true`.
    #[error("request rejected: {}", message.as_deref().unwrap_or("no reason given"))]
    Rejected { message: Option<String>, payload: Value },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Collapse the error into the single message shown to a user.
    pub fn user_message(&self, default: &str) -> String {
        let message = match self {
            ApiError::Http {
                message: Some(m), ..
            } => Some(m.clone()),
            ApiError::Http { status, .. } => Some(format!("Request failed with status code {status}")),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Transport(TransportError(m)) => Some(m.clone()),
            ApiError::Deserialization(_) | ApiError::Serialization(_) => None,
        };
        match message {
            Some(m) if !m.trim().is_empty() => m,
            _ => default.to_string(),
        }
    }

    /// The rejected record, when the service answered `success:false` with a
    /// body shaped like a prediction result.
    pub fn rejected_prediction(&self) -> Option<PredictionResult> {
        match self {
            ApiError::Rejected { payload, .. } => serde_json::from_value(payload.clone()).ok(),
            _ => None,
        }
    }
}

/// A failed API call as seen by callers: one human-readable message plus the
/// underlying cause.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RequestFailure {
    pub message: String,
    #[source]
    pub cause: ApiError,
}

impl RequestFailure {
    pub fn new(cause: ApiError, default: &str) -> Self {
        Self {
            message: cause.user_message(default),
            cause,
        }
    }
}
