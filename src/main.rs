//! Churn Scorer - Main Entry Point
//!
//! Loads the configured model and threshold, then scores an example customer.

use anyhow::{Context, Result};
use churn_scorer::{config::LoggingConfig, Record, Scorer, ScorerConfig};
use std::fmt::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = ScorerConfig::load()?;
    init_logging(&config.logging)?;

    info!(
        model_path = %config.artifacts.model_path.display(),
        threshold_path = %config.artifacts.threshold_path.display(),
        format = ?config.artifacts.format,
        "Starting Churn Scorer"
    );

    println!("{}", run(&config)?);

    Ok(())
}

/// Load the artifacts and score the example customer, returning the console report
fn run(config: &ScorerConfig) -> Result<String> {
    let scorer = Scorer::from_config(&config.artifacts).context("Failed to load scorer artifacts")?;

    let mut report = String::new();
    writeln!(report, "Loaded model from {}", config.artifacts.model_path.display())?;
    writeln!(report, "Loaded threshold: {:.3}", scorer.threshold().value())?;

    // Categorical fields are not read by the bundled model
    let sample = Record::new()
        .with("gender", "Male")
        .with("senior_citizen", 0)
        .with("tenure", 12)
        .with("monthly_charges", 70.5)
        .with("total_charges", 850.75)
        .with("internet_service", "Fiber optic")
        .with("contract", "Month-to-month");

    writeln!(report, "\nChurn Prediction on Sample Input")?;
    let output = scorer.predict_churn(sample)?;
    write!(report, "{}", output)?;

    Ok(report)
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("churn_scorer={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}
