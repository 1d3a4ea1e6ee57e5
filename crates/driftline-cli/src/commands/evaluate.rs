// crates/driftline-cli/src/commands/evaluate.rs
//
// `driftline evaluate`: score the engine on a labelled test table and write
// classification_metrics.json.

use clap::Args;
use tabled::Tabled;

use driftline_core::table::load_labels;
use driftline_core::{DriftlineError, Table};
use driftline_inference::{ClassificationMetrics, EngineState, InferenceEngine};

use crate::config::DriftlineConfig;
use crate::output::{float_cell, format_json, format_table, OutputFormat};

/// Evaluate command.
#[derive(Debug, Args)]
pub struct EvaluateCmd {
    /// Test table (defaults to `test_data_path`).
    #[arg(long)]
    pub input: Option<String>,

    /// True labels: a JSON array, or a headed CSV such as `y_test.csv`.
    /// Without it, labels are read from the `target_column` of the test table.
    #[arg(long)]
    pub labels: Option<String>,

    /// Directory for the metrics file (defaults to `metrics_dir`).
    #[arg(long)]
    pub output_dir: Option<String>,

    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Run the evaluate command.
pub async fn run(
    cmd: &EvaluateCmd,
    config: &DriftlineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = InferenceEngine::load(&config.engine_config());
    if let EngineState::Uninitialized { reason } = engine.state() {
        return Err(DriftlineError::NotReady(reason.clone()).into());
    }

    let input = config.path(cmd.input.as_deref().unwrap_or(&config.test_data_path));
    let table = Table::load(&input)?;
    let y_true = match &cmd.labels {
        Some(path) => load_labels(config.path(path), &config.target_column)?,
        None => target_labels(&table, &config.target_column)?,
    };

    let y_pred: Vec<String> = engine
        .predict_batch(&table)?
        .into_iter()
        .map(|p| p.label)
        .collect();
    let metrics = ClassificationMetrics::compute(&y_true, &y_pred)?;
    let path = metrics.save(config.path(cmd.output_dir.as_deref().unwrap_or(&config.metrics_dir)))?;

    match cmd.format {
        OutputFormat::Json => println!("{}", format_json(&metrics)),
        OutputFormat::Table => {
            let rows = vec![
                MetricRow { metric: "accuracy", value: float_cell(metrics.accuracy) },
                MetricRow { metric: "precision", value: float_cell(metrics.precision) },
                MetricRow { metric: "recall", value: float_cell(metrics.recall) },
                MetricRow { metric: "f1_score", value: float_cell(metrics.f1_score) },
            ];
            println!("{}", format_table(&rows));
            println!();
            println!("Evaluated {} rows; metrics written to {}", table.len(), path.display());
        }
    }

    Ok(())
}

/// Labels from the target column, rendered as class-name strings.
fn target_labels(table: &Table, target: &str) -> Result<Vec<String>, DriftlineError> {
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.get(target).map(|v| v.to_string()).ok_or_else(|| {
                DriftlineError::Schema(format!("row {}: missing target column '{}'", i, target))
            })
        })
        .collect()
}
