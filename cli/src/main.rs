use std::io;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nutrient_cli::args::{CliArgs, Command, PredictArgs};
use nutrient_cli::session::run_session;
use nutrient_cli::UreqTransport;
use nutrient_core::{
    render_results, Api, HistoryQuery, PredictionClient, RootView, StatisticsQuery, ViewState,
};
use tracing::info;

fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with rendered output.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = CliArgs::parse();
    info!(base_url = %args.base_url, "starting");
    let api = Api::new(PredictionClient::new(&args.base_url), UreqTransport::new());

    match args.command {
        None => {
            let mut view = RootView::new(api);
            run_session(&mut view, io::stdin().lock(), io::stdout()).context("interactive session failed")?;
        }
        Some(Command::Predict(predict)) => predict_once(&api, &predict)?,
        Some(Command::Health) => {
            let health = api.check_health();
            println!("{}", health.status);
            if !health.is_healthy() {
                bail!("backend at {} is not reachable", api.client().base_url());
            }
        }
        Some(Command::History { limit, days, field_id }) => {
            let query = HistoryQuery { limit, days, field_id };
            let history = api.fetch_history_with(&query).context("history request failed")?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Some(Command::Statistics { days }) => {
            let stats = api
                .fetch_statistics_with(&StatisticsQuery { days })
                .context("statistics request failed")?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

/// Run one submission through the same form the interactive session uses.
fn predict_once(api: &Api<UreqTransport>, predict: &PredictArgs) -> Result<()> {
    let mut form = predict.to_form();
    let mut state = ViewState::default();
    let outcome = form.submit(api, &mut state);

    match render_results(state.prediction.as_ref()) {
        Ok(panel) => print!("{panel}"),
        Err(e) => println!("Could not render results: {e}"),
    }
    if let Err(e) = outcome {
        bail!("{e}");
    }
    Ok(())
}
