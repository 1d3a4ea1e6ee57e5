// crates/driftline-cli/src/commands/drift.rs
//
// `driftline check-drift`: compare the current batch against the reference,
// persist the drift status, and print per-feature verdicts.
//
// Ctrl-C aborts between features; the previous status file stays in place
// and the command exits non-zero.

use clap::Args;
use tabled::Tabled;

use driftline_core::Table;
use driftline_drift::{run_drift_check, DriftDetector, DriftStatus, ReferenceSummary};

use crate::config::DriftlineConfig;
use crate::output::{float_cell, format_json, format_table, OutputFormat};

/// Check-drift command.
#[derive(Debug, Args)]
pub struct CheckDriftCmd {
    /// Current batch (defaults to `current_data_path`).
    #[arg(long)]
    pub input: Option<String>,

    /// Significance threshold (overrides `significance_threshold`).
    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Tabled)]
struct DriftRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "KS statistic")]
    statistic: String,
    #[tabled(rename = "p-value")]
    p_value: String,
    #[tabled(rename = "Drifted")]
    drifted: String,
}

/// Run the check-drift command.
pub async fn run(
    cmd: &CheckDriftCmd,
    config: &DriftlineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let threshold = cmd.threshold.unwrap_or(config.significance_threshold);
    let detector = DriftDetector::new(threshold)?;

    let reference = ReferenceSummary::load(config.path(&config.reference_path))?;
    let current_path = config.path(cmd.input.as_deref().unwrap_or(&config.current_data_path));
    let current = Table::load(&current_path)?;
    let columns = config.numeric_columns.clone();
    let store = config.status_store();

    let abort = detector.abort_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, aborting drift check");
            abort.abort();
        }
    });

    let result = tokio::task::spawn_blocking(move || {
        run_drift_check(&detector, &reference, &current, &columns, &store)
    })
    .await;
    watcher.abort();
    let status = result??;

    print_status(&status, cmd.format);
    Ok(())
}

fn print_status(status: &DriftStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", format_json(status)),
        OutputFormat::Table => {
            let rows: Vec<DriftRow> = status
                .features
                .iter()
                .map(|f| DriftRow {
                    feature: f.column.clone(),
                    statistic: float_cell(f.statistic),
                    p_value: float_cell(f.p_value),
                    drifted: if f.drifted { "yes" } else { "no" }.to_string(),
                })
                .collect();
            println!("{}", format_table(&rows));
            println!();
            println!("Threshold:       p < {}", status.threshold);
            println!("Drift detected:  {}", status.drift_detected);
            println!("Run:             {}", status.run_id);
        }
    }
}
