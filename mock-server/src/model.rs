//! Stand-in nutrient models and the status classification the service
//! attaches to each estimate.

use serde::{Deserialize, Serialize};

/// Confidence reported for every estimate of the stand-in models.
pub const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Inputs a model sees after the request has been validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub ndvi: f64,
    pub chlorophyll: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub day_of_year: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientValues {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

/// Something that turns validated features into nutrient estimates (mg/kg).
pub trait NutrientModel: Send + Sync {
    fn predict(&self, features: &Features) -> Result<NutrientValues, String>;
}

/// Deterministic linear placeholder. Estimates grow with vegetation density
/// and chlorophyll; location and date are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearModel;

impl NutrientModel for LinearModel {
    fn predict(&self, features: &Features) -> Result<NutrientValues, String> {
        let Features { ndvi, chlorophyll, .. } = *features;
        Ok(NutrientValues {
            nitrogen: 40.0 + 120.0 * ndvi + 1.5 * chlorophyll,
            phosphorus: 10.0 + 25.0 * ndvi + 0.3 * chlorophyll,
            potassium: 120.0 + 150.0 * ndvi + 2.0 * chlorophyll,
        })
    }
}

/// Always fails with the given reason. Useful for exercising error paths.
#[derive(Debug, Clone)]
pub struct FailingModel(pub String);

impl NutrientModel for FailingModel {
    fn predict(&self, _features: &Features) -> Result<NutrientValues, String> {
        Err(self.0.clone())
    }
}

/// Label an estimate against per-nutrient adequacy bands (low, high).
pub fn classify(nutrient: &str, value: f64) -> &'static str {
    let (low, high) = match nutrient {
        "nitrogen" => (50.0, 150.0),
        "phosphorus" => (20.0, 40.0),
        "potassium" => (150.0, 300.0),
        _ => return "Unknown",
    };
    if value < low {
        "Deficient"
    } else if value > high {
        "Excess"
    } else {
        "Adequate"
    }
}
