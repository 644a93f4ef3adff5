//! Plain-text rendering of prediction results and of the whole view.
//!
//! Rendering is a pure function of state. Presence and shape of the nutrient
//! sections, the id and the timestamp are checked here and nowhere earlier; a
//! successful record that does not fit is reported as a [`RenderError`].

use std::fmt::{self, Write as _};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::api::Transport;
use crate::form::{FormField, PredictionForm};
use crate::types::{Nutrient, PredictionResult};
use crate::view::{Connectivity, RootView};

pub const VALUE_UNIT: &str = "mg/kg";
const TITLE: &str = "Sugarcane Nutrient Prediction";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("prediction record has no '{0}' section")]
    MissingSection(&'static str),
    #[error("'{section}' has no usable {nutrient} entry")]
    BadEntry {
        section: &'static str,
        nutrient: &'static str,
    },
    #[error("prediction record has a malformed '{0}'")]
    BadField(&'static str),
}

/// Render the results panel in the viewer's local time zone. An absent
/// record renders as an empty string.
pub fn render_results(result: Option<&PredictionResult>) -> Result<String, RenderError> {
    render_results_in(result, &Local)
}

pub fn render_results_in<Tz>(result: Option<&PredictionResult>, tz: &Tz) -> Result<String, RenderError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let Some(result) = result else {
        return Ok(String::new());
    };

    let mut out = String::new();
    if !result.success {
        out.push_str("Error\n");
        let _ = writeln!(out, "  {}", result.error.as_deref().unwrap_or("Prediction failed"));
        return Ok(out);
    }

    let predictions = result.predictions.as_ref().ok_or(RenderError::MissingSection("predictions"))?;
    let status = result.status.as_ref().ok_or(RenderError::MissingSection("status"))?;
    let confidence = result.confidence.as_ref().ok_or(RenderError::MissingSection("confidence"))?;

    out.push_str("Results\n");
    for nutrient in Nutrient::ALL {
        let value = entry(predictions, "predictions", nutrient, Value::as_f64)?;
        let label = entry(status, "status", nutrient, Value::as_str)?;
        let certainty = entry(confidence, "confidence", nutrient, Value::as_f64)?;
        let _ = writeln!(out, "  {}", nutrient.label());
        let _ = writeln!(out, "    {value:.2} {VALUE_UNIT}");
        let _ = writeln!(out, "    {label}");
        let _ = writeln!(out, "    Confidence: {}%", confidence_percent(certainty));
    }

    let id = match &result.prediction_id {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(RenderError::BadField("prediction_id")),
    };
    let time = match &result.timestamp {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(ts)) => format_timestamp(ts, tz),
        Some(_) => return Err(RenderError::BadField("timestamp")),
    };
    let _ = writeln!(out, "  Prediction ID: {id} | Time: {time}");
    Ok(out)
}

fn entry<'a, T>(
    section: &'a Value,
    name: &'static str,
    nutrient: Nutrient,
    read: impl Fn(&'a Value) -> Option<T>,
) -> Result<T, RenderError> {
    PredictionResult::entry(Some(section), nutrient)
        .and_then(read)
        .ok_or(RenderError::BadEntry {
            section: name,
            nutrient: nutrient.key(),
        })
}

/// Confidence in [0,1] as a whole percentage.
pub fn confidence_percent(confidence: f64) -> i64 {
    (confidence * 100.0).round() as i64
}

/// Show a service timestamp in `tz`. Timestamps without an offset are UTC;
/// anything unparseable is shown as sent.
pub fn format_timestamp<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let parsed: Option<DateTime<Utc>> = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        });
    match parsed {
        Some(dt) => dt.with_timezone(tz).format(TIME_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

fn render_form(form: &PredictionForm, out: &mut String) {
    out.push_str("Enter crop parameters to get nutrient predictions\n");
    if let Some(error) = form.error() {
        let _ = writeln!(out, "  ! {error}");
    }
    for field in FormField::ALL {
        let value = form.values().get(field);
        if value.is_empty() {
            let _ = writeln!(out, "  {:<24} [{}]  ({})", field.label(), field.name(), field.hint());
        } else {
            let _ = writeln!(out, "  {:<24} [{}]  {value}", field.label(), field.name());
        }
    }
    if form.is_submitting() {
        out.push_str("  [ Predicting... ] (disabled)\n");
    } else {
        out.push_str("  [ Get Prediction ]\n");
    }
}

/// Render header, error banner, form and results panel.
pub fn render_view<T: Transport>(view: &RootView<T>) -> String {
    let mut out = String::new();
    let indicator = match view.connectivity() {
        Connectivity::Connected => "[+]",
        Connectivity::Disconnected => "[x]",
        Connectivity::Checking => "[?]",
    };
    let _ = writeln!(
        out,
        "== {TITLE} ==  Backend: {indicator} {}  [Retry]",
        view.connectivity().label()
    );
    if let Some(error) = view.error() {
        let _ = writeln!(out, "!! {error}");
    }
    out.push('\n');
    render_form(view.form(), &mut out);

    match render_results(view.prediction()) {
        Ok(panel) if panel.is_empty() => {}
        Ok(panel) => {
            out.push('\n');
            out.push_str(&panel);
        }
        Err(e) => {
            let _ = writeln!(out, "\nCould not render results: {e}");
        }
    }
    out
}
