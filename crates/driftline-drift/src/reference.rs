// crates/driftline-drift/src/reference.rs
//
// Reference distribution summary: raw per-feature samples captured once from
// the training feature table, before any oversampling or scaling.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use driftline_core::artifact::{self, FORMAT_VERSION};
use driftline_core::{DriftlineError, Result, Table};

/// Raw reference samples per numeric feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSummary {
    format_version: u32,
    /// When the reference was captured.
    pub captured_at: DateTime<Utc>,
    /// Where the samples came from (usually the raw training table path).
    pub source: String,
    samples: BTreeMap<String, Vec<f64>>,
}

impl ReferenceSummary {
    /// Capture the listed numeric columns from `data`.
    ///
    /// Fails with `Schema` if the table is empty or any column is missing,
    /// non-numeric, or non-finite.
    pub fn capture(data: &Table, numeric_columns: &[String], source: impl Into<String>) -> Result<Self> {
        if data.is_empty() {
            return Err(DriftlineError::Schema(
                "cannot capture a reference from an empty table".to_string(),
            ));
        }
        let mut samples = BTreeMap::new();
        for column in numeric_columns {
            let values = data.numeric_column(column)?;
            if values.iter().any(|v| !v.is_finite()) {
                return Err(DriftlineError::Schema(format!(
                    "reference column '{}' contains non-finite values",
                    column
                )));
            }
            samples.insert(column.clone(), values);
        }

        let source = source.into();
        tracing::info!(
            "Captured reference from '{}': {} columns x {} rows",
            source,
            samples.len(),
            data.len()
        );
        Ok(Self {
            format_version: FORMAT_VERSION,
            captured_at: Utc::now(),
            source,
            samples,
        })
    }

    /// Reference sample for `column`, or `Schema` if it was never captured.
    pub fn sample(&self, column: &str) -> Result<&[f64]> {
        self.samples
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                DriftlineError::Schema(format!("reference summary has no column '{}'", column))
            })
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.samples.contains_key(column)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        artifact::write_json_atomic(path, self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let summary: ReferenceSummary = artifact::read_json(path)?;
        artifact::ensure_format_version(summary.format_version, "reference summary")?;
        Ok(summary)
    }
}
