//! Top-level session state: connectivity, last result, last error, and the
//! form.

use tracing::{info, warn};

use crate::api::{Api, Transport};
use crate::error::RequestFailure;
use crate::form::{FormError, PredictionForm, SubmissionListener};
use crate::types::PredictionResult;

/// Backend reachability as last observed by the health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Checking,
    Connected,
    Disconnected,
}

impl Connectivity {
    pub fn label(self) -> &'static str {
        match self {
            Connectivity::Checking => "Checking...",
            Connectivity::Connected => "Connected",
            Connectivity::Disconnected => "Disconnected",
        }
    }
}

/// What the results panel and error banner show. Replaced wholesale by every
/// form event.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub prediction: Option<PredictionResult>,
    pub error: Option<String>,
    pub connectivity: Connectivity,
}

impl SubmissionListener for ViewState {
    fn on_success(&mut self, result: PredictionResult) {
        self.prediction = Some(result);
        self.error = None;
    }

    /// A `success:false` answer replaces the shown record so the results
    /// panel can show the service's reason; any other failure leaves the
    /// previous result on screen.
    fn on_failure(&mut self, failure: &RequestFailure) {
        if let Some(rejected) = failure.cause.rejected_prediction() {
            self.prediction = Some(rejected);
        }
        self.error = Some(failure.message.clone());
    }
}

/// The root of a client session.
#[derive(Debug)]
pub struct RootView<T> {
    api: Api<T>,
    form: PredictionForm,
    state: ViewState,
    offline_banner: String,
}

impl<T: Transport> RootView<T> {
    /// Build the view without touching the network. Call [`RootView::mount`]
    /// to run the startup probe.
    pub fn new(api: Api<T>) -> Self {
        let offline_banner = format!(
            "Cannot connect to backend. Make sure the backend is running at {}.",
            api.client().base_url()
        );
        Self {
            api,
            form: PredictionForm::new(),
            state: ViewState::default(),
            offline_banner,
        }
    }

    pub fn mount(&mut self) -> Connectivity {
        info!("mounting view, checking backend");
        self.retry()
    }

    /// Probe the backend and update the indicator. A failed probe shows a
    /// fixed guidance banner; a successful one clears only that banner.
    pub fn retry(&mut self) -> Connectivity {
        self.state.connectivity = Connectivity::Checking;
        let health = self.api.check_health();
        if health.is_healthy() {
            info!("backend connected");
            self.state.connectivity = Connectivity::Connected;
            if self.state.error.as_deref() == Some(self.offline_banner.as_str()) {
                self.state.error = None;
            }
        } else {
            warn!(status = %health.status, "backend disconnected");
            self.state.connectivity = Connectivity::Disconnected;
            self.state.error = Some(self.offline_banner.clone());
        }
        self.state.connectivity
    }

    /// Submit the form and route the outcome into the view state.
    pub fn submit(&mut self) -> Result<(), FormError> {
        self.form.submit(&self.api, &mut self.state)
    }

    pub fn api(&self) -> &Api<T> {
        &self.api
    }

    pub fn form(&self) -> &PredictionForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut PredictionForm {
        &mut self.form
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn connectivity(&self) -> Connectivity {
        self.state.connectivity
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.state.prediction.as_ref()
    }
}
