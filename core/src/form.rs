//! Measurement entry form: editable values, validation and the submission
//! lifecycle.
//!
//! # Design
//! Field values are kept as the raw strings a user typed. Only validation
//! turns them into a typed [`MeasurementInput`], so a half-typed number never
//! needs a representation of its own.
//!
//! Submission is split in two halves, mirroring the client's build/parse
//! split. `begin_submit` validates and moves the form into the submitting
//! phase, which is the "disabled submit control": a second `begin_submit` is
//! refused until `finish_submit` hands back the outcome. `submit` runs both
//! halves around a blocking [`Api`] call.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{Api, Transport};
use crate::error::RequestFailure;
use crate::types::{MeasurementInput, PredictionResult};

/// Every input the form exposes, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Ndvi,
    Chlorophyll,
    Latitude,
    Longitude,
    DayOfYear,
    FieldId,
    Notes,
}

impl FormField {
    pub const ALL: [FormField; 7] = [
        FormField::Ndvi,
        FormField::Chlorophyll,
        FormField::Latitude,
        FormField::Longitude,
        FormField::DayOfYear,
        FormField::FieldId,
        FormField::Notes,
    ];

    /// Wire key of the field.
    pub fn name(self) -> &'static str {
        match self {
            FormField::Ndvi => "ndvi",
            FormField::Chlorophyll => "chlorophyll",
            FormField::Latitude => "latitude",
            FormField::Longitude => "longitude",
            FormField::DayOfYear => "day_of_year",
            FormField::FieldId => "field_id",
            FormField::Notes => "notes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormField::Ndvi => "NDVI (0-1) *",
            FormField::Chlorophyll => "Chlorophyll (mg/m²) *",
            FormField::Latitude => "Latitude (optional)",
            FormField::Longitude => "Longitude (optional)",
            FormField::DayOfYear => "Day of Year (optional)",
            FormField::FieldId => "Field ID (optional)",
            FormField::Notes => "Notes (optional)",
        }
    }

    /// Example value or accepted range shown next to an empty input. The
    /// day-of-year range is advisory only and is not enforced on submit.
    pub fn hint(self) -> &'static str {
        match self {
            FormField::Ndvi => "e.g. 0.75",
            FormField::Chlorophyll => "e.g. 35.5",
            FormField::Latitude => "e.g. 19.1136",
            FormField::Longitude => "e.g. 72.8697",
            FormField::DayOfYear => "1-365",
            FormField::FieldId => "e.g. FIELD_001",
            FormField::Notes => "any observations",
        }
    }

    pub fn is_required(self) -> bool {
        matches!(self, FormField::Ndvi | FormField::Chlorophyll)
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for FormField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        match key.as_str() {
            "ndvi" => Ok(FormField::Ndvi),
            "chlorophyll" => Ok(FormField::Chlorophyll),
            "latitude" | "lat" => Ok(FormField::Latitude),
            "longitude" | "lon" | "lng" => Ok(FormField::Longitude),
            "day_of_year" | "day" => Ok(FormField::DayOfYear),
            "field_id" | "field" => Ok(FormField::FieldId),
            "notes" => Ok(FormField::Notes),
            _ => Err(UnknownField(s.to_string())),
        }
    }
}

/// Local validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("NDVI and Chlorophyll are required")]
    MissingRequired,
    #[error("NDVI must be a number between 0 and 1")]
    NdviOutOfRange,
    #[error("Chlorophyll must be a non-negative number")]
    ChlorophyllNegative,
    #[error("{0} must be a number")]
    NotANumber(&'static str),
    #[error("Day of year must be a whole number")]
    DayOfYearNotInteger,
}

/// Raw, user-editable field values. Empty means "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub ndvi: String,
    pub chlorophyll: String,
    pub latitude: String,
    pub longitude: String,
    pub day_of_year: String,
    pub field_id: String,
    pub notes: String,
}

impl FormValues {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Ndvi => &self.ndvi,
            FormField::Chlorophyll => &self.chlorophyll,
            FormField::Latitude => &self.latitude,
            FormField::Longitude => &self.longitude,
            FormField::DayOfYear => &self.day_of_year,
            FormField::FieldId => &self.field_id,
            FormField::Notes => &self.notes,
        }
    }

    fn slot(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Ndvi => &mut self.ndvi,
            FormField::Chlorophyll => &mut self.chlorophyll,
            FormField::Latitude => &mut self.latitude,
            FormField::Longitude => &mut self.longitude,
            FormField::DayOfYear => &mut self.day_of_year,
            FormField::FieldId => &mut self.field_id,
            FormField::Notes => &mut self.notes,
        }
    }

    pub fn is_empty(&self) -> bool {
        FormField::ALL.iter().all(|f| self.get(*f).is_empty())
    }

    /// Validate the required fields and coerce the optional ones.
    ///
    /// Optional inputs that are blank are left out of the payload. The
    /// day-of-year value is only coerced to an integer; its 1-365 range is
    /// left to the service.
    pub fn to_measurement(&self) -> Result<MeasurementInput, ValidationError> {
        if is_blank(&self.ndvi) || is_blank(&self.chlorophyll) {
            return Err(ValidationError::MissingRequired);
        }

        let ndvi = parse_finite(&self.ndvi)
            .filter(|v| (0.0..=1.0).contains(v))
            .ok_or(ValidationError::NdviOutOfRange)?;
        let chlorophyll = parse_finite(&self.chlorophyll)
            .filter(|v| *v >= 0.0)
            .ok_or(ValidationError::ChlorophyllNegative)?;

        let mut input = MeasurementInput::new(ndvi, chlorophyll);
        input.latitude = optional_number(&self.latitude, "Latitude")?;
        input.longitude = optional_number(&self.longitude, "Longitude")?;
        input.day_of_year = match present(&self.day_of_year) {
            Some(raw) => Some(raw.parse::<i32>().map_err(|_| ValidationError::DayOfYearNotInteger)?),
            None => None,
        };
        input.field_id = free_text(&self.field_id);
        input.notes = free_text(&self.notes);
        Ok(input)
    }
}

fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

fn present(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Free text is sent exactly as typed once it has any non-blank content.
fn free_text(raw: &str) -> Option<String> {
    present(raw).map(|_| raw.to_string())
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn optional_number(raw: &str, label: &'static str) -> Result<Option<f64>, ValidationError> {
    match present(raw) {
        Some(value) => parse_finite(value).map(Some).ok_or(ValidationError::NotANumber(label)),
        None => Ok(None),
    }
}

/// Where the form is in its submission lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPhase {
    #[default]
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Error)]
pub enum FormError {
    #[error("a submission is already in progress")]
    Busy,
    #[error("no submission is in progress")]
    NotSubmitting,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Request(#[from] RequestFailure),
}

/// Parent-side callbacks for finished submissions.
pub trait SubmissionListener {
    fn on_success(&mut self, result: PredictionResult);
    fn on_failure(&mut self, failure: &RequestFailure);
}

/// The measurement entry form.
#[derive(Debug, Clone, Default)]
pub struct PredictionForm {
    values: FormValues,
    phase: SubmitPhase,
    error: Option<String>,
}

impl PredictionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn phase(&self) -> SubmitPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == SubmitPhase::Submitting
    }

    /// Inline error for the form, either a validation message or the last
    /// request failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace one field's value. Any edit clears the inline error.
    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        *self.values.slot(field) = value.into();
        self.error = None;
    }

    pub fn clear_field(&mut self, field: FormField) {
        self.set_field(field, String::new());
    }

    pub fn reset(&mut self) {
        self.values = FormValues::default();
        self.error = None;
    }

    /// Validate and enter the submitting phase, returning the payload to send.
    pub fn begin_submit(&mut self) -> Result<MeasurementInput, FormError> {
        if self.is_submitting() {
            warn!("submit ignored while a submission is in flight");
            return Err(FormError::Busy);
        }
        debug!("validating form");
        match self.values.to_measurement() {
            Ok(payload) => {
                debug!(?payload, "form validation passed");
                self.error = None;
                self.phase = SubmitPhase::Submitting;
                Ok(payload)
            }
            Err(e) => {
                info!(error = %e, "form validation failed");
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Apply the outcome of the request started by `begin_submit`.
    ///
    /// Success resets every field; failure keeps them so the user can fix
    /// and resubmit.
    pub fn finish_submit(
        &mut self,
        outcome: Result<PredictionResult, RequestFailure>,
        listener: &mut impl SubmissionListener,
    ) -> Result<(), FormError> {
        if !self.is_submitting() {
            return Err(FormError::NotSubmitting);
        }
        let finished = match outcome {
            Ok(result) => {
                info!("prediction succeeded");
                self.error = None;
                listener.on_success(result);
                self.values = FormValues::default();
                Ok(())
            }
            Err(failure) => {
                warn!(message = %failure.message, "prediction failed");
                self.error = Some(failure.message.clone());
                listener.on_failure(&failure);
                Err(FormError::Request(failure))
            }
        };
        self.phase = SubmitPhase::Idle;
        finished
    }

    /// Validate, send and apply the outcome in one blocking step.
    pub fn submit<T: Transport>(
        &mut self,
        api: &Api<T>,
        listener: &mut impl SubmissionListener,
    ) -> Result<(), FormError> {
        let payload = self.begin_submit()?;
        let outcome = api.submit_prediction(&payload);
        self.finish_submit(outcome, listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{api, ScriptedTransport};

    #[derive(Default)]
    struct Recorder {
        successes: Vec<PredictionResult>,
        failures: Vec<String>,
    }

    impl SubmissionListener for Recorder {
        fn on_success(&mut self, result: PredictionResult) {
            self.successes.push(result);
        }

        fn on_failure(&mut self, failure: &RequestFailure) {
            self.failures.push(failure.message.clone());
        }
    }

    fn filled(ndvi: &str, chlorophyll: &str) -> PredictionForm {
        let mut form = PredictionForm::new();
        form.set_field(FormField::Ndvi, ndvi);
        form.set_field(FormField::Chlorophyll, chlorophyll);
        form
    }

    const OK_BODY: &str = r#"{"success":true,"prediction_id":1}"#;

    #[test]
    fn missing_required_fields_are_rejected_together() {
        let mut form = filled("0.5", "");
        let err = form.begin_submit().unwrap_err();
        assert!(matches!(err, FormError::Invalid(ValidationError::MissingRequired)));
        assert_eq!(form.error(), Some("NDVI and Chlorophyll are required"));
        assert!(!form.is_submitting());
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut form = filled("   ", "12");
        assert!(matches!(
            form.begin_submit(),
            Err(FormError::Invalid(ValidationError::MissingRequired))
        ));
    }

    #[test]
    fn ndvi_outside_unit_interval_never_hits_network() {
        for ndvi in ["1.5", "-0.01", "abc", "NaN", "inf"] {
            let transport = ScriptedTransport::default().reply(200, OK_BODY);
            let api = api(transport);
            let mut form = filled(ndvi, "35.5");
            let mut recorder = Recorder::default();
            let err = form.submit(&api, &mut recorder).unwrap_err();
            assert!(
                matches!(err, FormError::Invalid(ValidationError::NdviOutOfRange)),
                "ndvi={ndvi}"
            );
            assert_eq!(api.transport().request_count(), 0, "ndvi={ndvi}");
            assert!(recorder.failures.is_empty());
        }
    }

    #[test]
    fn ndvi_bounds_are_inclusive() {
        assert!(filled("0", "1").values().to_measurement().is_ok());
        assert!(filled("1", "1").values().to_measurement().is_ok());
    }

    #[test]
    fn negative_or_non_numeric_chlorophyll_never_hits_network() {
        for chlorophyll in ["-1", "-0.0001", "lots", "inf"] {
            let api = api(ScriptedTransport::default().reply(200, OK_BODY));
            let mut form = filled("0.5", chlorophyll);
            let err = form.submit(&api, &mut Recorder::default()).unwrap_err();
            assert!(
                matches!(err, FormError::Invalid(ValidationError::ChlorophyllNegative)),
                "chlorophyll={chlorophyll}"
            );
            assert_eq!(api.transport().request_count(), 0);
        }
    }

    #[test]
    fn scenario_required_only_payload() {
        let api = api(ScriptedTransport::default().reply(201, OK_BODY));
        let mut form = filled("0.75", "35.5");
        form.submit(&api, &mut Recorder::default()).unwrap();
        assert_eq!(
            api.transport().last_body().unwrap(),
            serde_json::json!({"ndvi": 0.75, "chlorophyll": 35.5})
        );
    }

    #[test]
    fn populated_optionals_are_coerced_and_blank_ones_omitted() {
        let api = api(ScriptedTransport::default().reply(201, OK_BODY));
        let mut form = filled("0.6", "40");
        form.set_field(FormField::Latitude, "19.1136");
        form.set_field(FormField::DayOfYear, "150");
        form.set_field(FormField::FieldId, "FIELD_001");
        form.set_field(FormField::Notes, "  ");
        form.submit(&api, &mut Recorder::default()).unwrap();

        let body = api.transport().last_body().unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "ndvi": 0.6,
                "chlorophyll": 40.0,
                "latitude": 19.1136,
                "day_of_year": 150,
                "field_id": "FIELD_001"
            })
        );
        assert!(body["day_of_year"].is_i64());
    }

    #[test]
    fn free_text_is_sent_as_typed() {
        let mut form = filled("0.6", "40");
        form.set_field(FormField::FieldId, " FIELD_001 ");
        form.set_field(FormField::Notes, "  leaves yellowing at edges\n");
        let payload = form.values().to_measurement().unwrap();
        assert_eq!(payload.field_id.as_deref(), Some(" FIELD_001 "));
        assert_eq!(payload.notes.as_deref(), Some("  leaves yellowing at edges\n"));
    }

    #[test]
    fn day_of_year_range_is_not_enforced() {
        let payload = {
            let mut form = filled("0.6", "40");
            form.set_field(FormField::DayOfYear, "400");
            form.values().to_measurement().unwrap()
        };
        assert_eq!(payload.day_of_year, Some(400));
    }

    #[test]
    fn uncoercible_optionals_are_rejected() {
        let mut form = filled("0.6", "40");
        form.set_field(FormField::Longitude, "east");
        assert_eq!(
            form.values().to_measurement(),
            Err(ValidationError::NotANumber("Longitude"))
        );

        let mut form = filled("0.6", "40");
        form.set_field(FormField::DayOfYear, "150.5");
        assert_eq!(
            form.values().to_measurement(),
            Err(ValidationError::DayOfYearNotInteger)
        );
    }

    #[test]
    fn success_resets_fields_and_reports_result() {
        let api = api(ScriptedTransport::default().reply(201, OK_BODY));
        let mut form = filled("0.75", "35.5");
        form.set_field(FormField::Notes, "wet season");
        let mut recorder = Recorder::default();
        form.submit(&api, &mut recorder).unwrap();

        assert!(form.values().is_empty());
        assert_eq!(form.error(), None);
        assert_eq!(form.phase(), SubmitPhase::Idle);
        assert_eq!(recorder.successes.len(), 1);
    }

    #[test]
    fn failure_keeps_fields_and_reports_message() {
        let api = api(ScriptedTransport::default().reply(500, r#"{"error":"Internal server error: boom","success":false}"#));
        let mut form = filled("0.75", "35.5");
        let mut recorder = Recorder::default();
        let err = form.submit(&api, &mut recorder).unwrap_err();

        assert!(matches!(err, FormError::Request(_)));
        assert_eq!(form.values().ndvi, "0.75");
        assert_eq!(form.error(), Some("Internal server error: boom"));
        assert_eq!(recorder.failures, vec!["Internal server error: boom".to_string()]);
        assert!(!form.is_submitting());
    }

    #[test]
    fn second_submit_is_refused_while_in_flight() {
        let mut form = filled("0.75", "35.5");
        form.begin_submit().unwrap();
        assert!(form.is_submitting());
        assert!(matches!(form.begin_submit(), Err(FormError::Busy)));
    }

    #[test]
    fn finish_without_begin_is_an_error() {
        let mut form = PredictionForm::new();
        let outcome = Ok(serde_json::from_str(OK_BODY).unwrap());
        assert!(matches!(
            form.finish_submit(outcome, &mut Recorder::default()),
            Err(FormError::NotSubmitting)
        ));
    }

    #[test]
    fn editing_clears_inline_error() {
        let mut form = filled("2", "1");
        let _ = form.begin_submit();
        assert!(form.error().is_some());
        form.set_field(FormField::Ndvi, "0.2");
        assert!(form.error().is_none());
    }

    #[test]
    fn field_names_parse_with_aliases() {
        assert_eq!("day".parse::<FormField>().unwrap(), FormField::DayOfYear);
        assert_eq!("Field-ID".parse::<FormField>().unwrap(), FormField::FieldId);
        assert!("soil".parse::<FormField>().is_err());
    }
}
