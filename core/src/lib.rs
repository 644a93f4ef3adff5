//! Client core for the sugarcane nutrient prediction service.
//!
//! # Overview
//! Collects agronomic measurements (NDVI, chlorophyll, location, date),
//! validates them locally, submits them to the remote prediction service and
//! renders the returned nitrogen/phosphorus/potassium estimates.
//!
//! # Design
//! - `PredictionClient` is stateless and never touches the network. Each
//!   operation is split into `build_*` (produces a request) and `parse_*`
//!   (consumes a response), so the I/O boundary is explicit.
//! - `Transport` is the single I/O seam; `Api` drives build, execute and
//!   parse and collapses every failure into one user-facing message.
//! - `PredictionForm` owns raw field text and the idle/submitting lifecycle;
//!   `RootView` owns connectivity, the last result and the last error.
//! - Diagnostics go through `tracing`; the host picks the subscriber.

pub mod api;
pub mod client;
pub mod error;
pub mod form;
pub mod http;
pub mod render;
pub mod types;
pub mod view;

pub use api::{Api, Transport};
pub use client::{PredictionClient, DEFAULT_BASE_URL};
pub use error::{ApiError, RequestFailure, TransportError};
pub use form::{FormError, FormField, FormValues, PredictionForm, SubmissionListener, SubmitPhase, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use render::{render_results, render_view, RenderError};
pub use types::{HealthStatus, HistoryQuery, MeasurementInput, Nutrient, PredictionResult, StatisticsQuery};
pub use view::{Connectivity, RootView, ViewState};
