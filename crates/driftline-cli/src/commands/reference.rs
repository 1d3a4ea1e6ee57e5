// crates/driftline-cli/src/commands/reference.rs
//
// `driftline capture-reference`: snapshot raw per-feature samples for
// later drift checks.

use clap::Args;

use driftline_core::Table;
use driftline_drift::ReferenceSummary;

use crate::config::DriftlineConfig;

/// Capture-reference command.
#[derive(Debug, Args)]
pub struct CaptureReferenceCmd {
    /// Raw feature table (defaults to `training_data_path`).
    #[arg(long)]
    pub input: Option<String>,

    /// Where to write the summary (defaults to `reference_path`).
    #[arg(long)]
    pub output: Option<String>,
}

/// Run the capture-reference command.
pub async fn run(
    cmd: &CaptureReferenceCmd,
    config: &DriftlineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = cmd.input.as_deref().unwrap_or(&config.training_data_path);
    let input = config.path(source);
    let output = config.path(cmd.output.as_deref().unwrap_or(&config.reference_path));

    let table = Table::load(&input)?;
    let summary = ReferenceSummary::capture(&table, &config.numeric_columns, source)?;
    summary.save(&output)?;

    tracing::info!(
        "Reference holds raw samples; a model trained on oversampled data may see a different distribution"
    );
    println!(
        "Captured {} columns x {} rows from {} -> {}",
        config.numeric_columns.len(),
        table.len(),
        input.display(),
        output.display()
    );

    Ok(())
}
