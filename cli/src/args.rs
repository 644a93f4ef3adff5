use clap::{Parser, Subcommand};
use nutrient_core::{FormField, PredictionForm, DEFAULT_BASE_URL};

#[derive(Parser, Debug)]
#[command(name = "nutrient-cli")]
#[command(about = "Submit sugarcane field measurements and view nutrient predictions")]
#[command(version)]
pub struct CliArgs {
    /// Base address of the prediction service
    #[arg(long, env = "NUTRIENT_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Without a subcommand, start the interactive session
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate and submit one measurement, then print the results
    Predict(PredictArgs),

    /// Probe the service's liveness endpoint
    Health,

    /// Print recent predictions
    History {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 30)]
        days: u32,
        #[arg(long)]
        field_id: Option<String>,
    },

    /// Print aggregate statistics
    Statistics {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

/// Raw field text. Validation happens in the form, exactly as in the
/// interactive session, so values are taken as strings here.
#[derive(clap::Args, Debug, Default)]
pub struct PredictArgs {
    /// Normalized Difference Vegetation Index, 0 to 1
    #[arg(long, allow_hyphen_values = true)]
    pub ndvi: Option<String>,

    /// Leaf chlorophyll content (mg/m²), non-negative
    #[arg(long, allow_hyphen_values = true)]
    pub chlorophyll: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<String>,

    /// Day of year, 1-365
    #[arg(long)]
    pub day_of_year: Option<String>,

    #[arg(long)]
    pub field_id: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl PredictArgs {
    /// Every provided field paired with its form input.
    pub fn fields(&self) -> Vec<(FormField, &str)> {
        let provided = [
            (FormField::Ndvi, &self.ndvi),
            (FormField::Chlorophyll, &self.chlorophyll),
            (FormField::Latitude, &self.latitude),
            (FormField::Longitude, &self.longitude),
            (FormField::DayOfYear, &self.day_of_year),
            (FormField::FieldId, &self.field_id),
            (FormField::Notes, &self.notes),
        ];
        provided
            .into_iter()
            .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
            .collect()
    }

    /// A form filled with the provided fields, ready to submit.
    pub fn to_form(&self) -> PredictionForm {
        let mut form = PredictionForm::new();
        for (field, value) in self.fields() {
            form.set_field(field, value);
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutrient_core::ValidationError;

    #[test]
    fn no_subcommand_means_interactive() {
        let args = CliArgs::try_parse_from(["nutrient-cli"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn predict_collects_provided_fields() {
        let args = CliArgs::try_parse_from([
            "nutrient-cli",
            "--base-url",
            "http://fields.local/api",
            "predict",
            "--ndvi",
            "0.75",
            "--chlorophyll",
            "35.5",
            "--longitude",
            "-72.8",
            "--field-id",
            "FIELD_001",
        ])
        .unwrap();
        assert_eq!(args.base_url, "http://fields.local/api");
        let Some(Command::Predict(predict)) = args.command else {
            panic!("expected predict");
        };
        assert_eq!(
            predict.fields(),
            vec![
                (FormField::Ndvi, "0.75"),
                (FormField::Chlorophyll, "35.5"),
                (FormField::Longitude, "-72.8"),
                (FormField::FieldId, "FIELD_001"),
            ]
        );
    }

    #[test]
    fn missing_required_values_reach_form_validation() {
        let args = CliArgs::try_parse_from(["nutrient-cli", "predict", "--ndvi", "0.5"]).unwrap();
        let Some(Command::Predict(predict)) = args.command else {
            panic!("expected predict");
        };
        assert_eq!(
            predict.to_form().values().to_measurement(),
            Err(ValidationError::MissingRequired)
        );

        let args = CliArgs::try_parse_from(["nutrient-cli", "predict"]).unwrap();
        let Some(Command::Predict(predict)) = args.command else {
            panic!("expected predict");
        };
        assert!(predict.fields().is_empty());
        assert_eq!(
            predict.to_form().values().to_measurement().unwrap_err().to_string(),
            "NDVI and Chlorophyll are required"
        );
    }

    #[test]
    fn history_defaults_match_fixed_query() {
        let args = CliArgs::try_parse_from(["nutrient-cli", "history"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::History {
                limit: 50,
                days: 30,
                field_id: None
            })
        ));
    }
}
