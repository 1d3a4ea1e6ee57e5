// crates/driftline-cli/src/main.rs
//
// CLI entrypoint for Driftline.
//
// Subcommands cover the offline steps (fitting the transform, capturing the
// drift reference, evaluating a model), the periodic drift check, and the
// prediction server.

mod commands;
mod config;
mod output;

use clap::{Parser, Subcommand};
use commands::drift::CheckDriftCmd;
use commands::evaluate::EvaluateCmd;
use commands::fit::FitTransformCmd;
use commands::reference::CaptureReferenceCmd;
use commands::serve::ServeCmd;
use config::DriftlineConfig;

use driftline_core::DriftlineError;

/// Driftline: real-time tabular prediction with drift-triggered retraining.
#[derive(Parser, Debug)]
#[command(
    name = "driftline",
    version = "0.1.0",
    about = "Serve tabular predictions and decide when the input distribution has drifted"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "driftline.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Fit the feature transform on the training table.
    FitTransform(FitTransformCmd),

    /// Capture the reference distribution used by drift checks.
    CaptureReference(CaptureReferenceCmd),

    /// Test the current batch for drift and persist the status.
    CheckDrift(CheckDriftCmd),

    /// Start the prediction server.
    Serve(ServeCmd),

    /// Score the model on the labelled test table.
    Evaluate(EvaluateCmd),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The config file decides the default log level, so read it before the
    // subscriber exists and report the outcome afterwards.
    let loaded = DriftlineConfig::load(&cli.config);
    let log_level = match &loaded {
        Ok(Some(cfg)) => cfg.log_level.clone(),
        _ => config::default_log_level(),
    };

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    let config = match loaded {
        Ok(Some(cfg)) => {
            tracing::info!("Loaded configuration from {}", cli.config);
            cfg
        }
        Ok(None) => {
            tracing::warn!("No configuration at {}. Using defaults.", cli.config);
            DriftlineConfig::default()
        }
        Err(e) => return Err(e.into()),
    };
    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e.into());
    }

    let result = match &cli.command {
        Commands::FitTransform(cmd) => commands::fit::run(cmd, &config).await,
        Commands::CaptureReference(cmd) => commands::reference::run(cmd, &config).await,
        Commands::CheckDrift(cmd) => commands::drift::run(cmd, &config).await,
        Commands::Serve(cmd) => commands::serve::run(cmd, &config).await,
        Commands::Evaluate(cmd) => commands::evaluate::run(cmd, &config).await,
    };

    if let Err(e) = &result {
        match e.downcast_ref::<DriftlineError>() {
            Some(DriftlineError::Aborted(_)) => {
                tracing::error!("Run aborted; previous artifacts left in place")
            }
            _ => tracing::error!("Command failed: {}", e),
        }
    }
    result
}
