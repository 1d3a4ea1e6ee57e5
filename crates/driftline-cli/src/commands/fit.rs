// crates/driftline-cli/src/commands/fit.rs
//
// `driftline fit-transform`: fit the transform store on the raw training
// table and write the artifact.

use clap::Args;
use tabled::Tabled;

use driftline_core::{DriftlineError, Table};
use driftline_transform::TransformStore;

use crate::config::DriftlineConfig;
use crate::output::{float_cell, format_json, format_table, OutputFormat};

/// Fit-transform command.
#[derive(Debug, Args)]
pub struct FitTransformCmd {
    /// Training table (defaults to `training_data_path`).
    #[arg(long)]
    pub input: Option<String>,

    /// Where to write the transform (defaults to `transform_path`).
    #[arg(long)]
    pub output: Option<String>,

    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Tabled)]
struct ScaleRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Scale")]
    scale: String,
}

/// Run the fit-transform command.
pub async fn run(
    cmd: &FitTransformCmd,
    config: &DriftlineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = config.path(cmd.input.as_deref().unwrap_or(&config.training_data_path));
    let output = config.path(cmd.output.as_deref().unwrap_or(&config.transform_path));

    let table = Table::load(&input)?;
    tracing::info!("Fitting transform on {} rows from {}", table.len(), input.display());
    let store = TransformStore::fit(&table, &config.numeric_columns, &config.categorical_columns)?;

    let constant = store.zero_scale_columns();
    if !constant.is_empty() {
        return Err(DriftlineError::Schema(format!(
            "columns {:?} are constant in the training data and would scale to non-finite values",
            constant
        ))
        .into());
    }

    store.save(&output)?;

    match cmd.format {
        OutputFormat::Json => println!("{}", format_json(&store)),
        OutputFormat::Table => {
            let rows: Vec<ScaleRow> = store
                .numeric_columns()
                .iter()
                .filter_map(|c| {
                    store.params(c).map(|p| ScaleRow {
                        column: c.clone(),
                        mean: float_cell(p.mean),
                        scale: float_cell(p.scale),
                    })
                })
                .collect();
            println!("{}", format_table(&rows));
            println!();
            println!("Passthrough:  {}", store.categorical_columns().join(", "));
            println!("Fingerprint:  {}", store.fingerprint());
            println!("Written to:   {}", output.display());
        }
    }

    Ok(())
}
