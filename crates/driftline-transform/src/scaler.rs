// crates/driftline-transform/src/scaler.rs
//
// TransformStore: fitted standard-scaling parameters plus the column schema
// they apply to.
//
// A store is produced once by the fitting step, written as a versioned JSON
// artifact, and loaded read-only by every serving process. Nothing mutates
// it after `fit` returns; serving and offline evaluation must apply the
// exact same parameters the model was trained behind.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use driftline_core::artifact::{self, FORMAT_VERSION};
use driftline_core::{DriftlineError, RawRecord, Result, Table, TransformedRecord};

/// Per-feature standardization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    /// Mean of the column over the fit data.
    pub mean: f64,
    /// Population standard deviation (ddof = 0) of the column over the fit data.
    pub scale: f64,
}

/// Fitted, immutable scaling transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStore {
    format_version: u32,
    /// Columns scaled numerically, in output order.
    numeric_columns: Vec<String>,
    /// Columns copied through unchanged, emitted after the numeric columns.
    categorical_columns: Vec<String>,
    /// Numeric column -> (mean, scale).
    params: BTreeMap<String, ScaleParams>,
    /// Categorical column -> sorted integer codes seen at fit time.
    #[serde(default)]
    categorical_levels: BTreeMap<String, Vec<i64>>,
    /// SHA-256 over the canonical parameter encoding (hex).
    fingerprint: String,
}

impl TransformStore {
    /// Fit scaling parameters on raw training features.
    ///
    /// Fails with `Schema` if a listed column is absent from any row, holds a
    /// non-finite value, or is listed twice. Identical inputs always produce
    /// identical parameters.
    ///
    /// A constant numeric column fits with `scale == 0`; applying the store
    /// then yields non-finite values. Callers that publish the store should
    /// reject it via [`TransformStore::zero_scale_columns`].
    pub fn fit(
        data: &Table,
        numeric_columns: &[String],
        categorical_columns: &[String],
    ) -> Result<Self> {
        if data.is_empty() {
            return Err(DriftlineError::Schema(
                "cannot fit a transform on an empty table".to_string(),
            ));
        }
        check_distinct(numeric_columns, categorical_columns)?;

        let mut params = BTreeMap::new();
        for column in numeric_columns {
            let values = data.numeric_column(column)?;
            if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                return Err(DriftlineError::Schema(format!(
                    "column '{}' contains non-finite value {}",
                    column, bad
                )));
            }
            let p = standardize(&values);
            if p.scale == 0.0 {
                tracing::warn!("Column '{}' has zero variance; scale is 0", column);
            }
            params.insert(column.clone(), p);
        }

        let mut categorical_levels = BTreeMap::new();
        for column in categorical_columns {
            let levels: BTreeSet<i64> = data.categorical_column(column)?.into_iter().collect();
            categorical_levels.insert(column.clone(), levels.into_iter().collect());
        }

        let mut store = Self {
            format_version: FORMAT_VERSION,
            numeric_columns: numeric_columns.to_vec(),
            categorical_columns: categorical_columns.to_vec(),
            params,
            categorical_levels,
            fingerprint: String::new(),
        };
        store.fingerprint = store.compute_fingerprint();

        tracing::info!(
            "Fitted transform on {} rows: {} numeric, {} categorical columns (fingerprint {})",
            data.len(),
            store.numeric_columns.len(),
            store.categorical_columns.len(),
            &store.fingerprint[..12]
        );
        Ok(store)
    }

    /// Transform one raw record.
    ///
    /// Numeric columns become `(value - mean) / scale`, categorical codes are
    /// copied unchanged, output order is numeric then categorical. Columns the
    /// store was not fit on are ignored; a missing required column is a
    /// `Schema` error. Non-finite results are propagated, not checked here.
    pub fn apply(&self, record: &RawRecord) -> Result<TransformedRecord> {
        let mut values = Vec::with_capacity(self.width());
        for column in &self.numeric_columns {
            let p = self.params.get(column).ok_or_else(|| {
                DriftlineError::Artifact(format!("no scale parameters for column '{}'", column))
            })?;
            values.push((record.numeric(column)? - p.mean) / p.scale);
        }
        for column in &self.categorical_columns {
            values.push(record.categorical(column)? as f64);
        }
        TransformedRecord::new(self.output_columns(), values)
    }

    /// Transform every row of a table, stopping at the first failure.
    ///
    /// A `Schema` error names the offending row.
    pub fn apply_batch(&self, data: &Table) -> Result<Vec<TransformedRecord>> {
        data.rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                self.apply(row).map_err(|e| match e {
                    DriftlineError::Schema(msg) => {
                        DriftlineError::Schema(format!("row {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect()
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn params(&self, column: &str) -> Option<ScaleParams> {
        self.params.get(column).copied()
    }

    /// Codes observed for a categorical column at fit time.
    pub fn categorical_levels(&self, column: &str) -> Option<&[i64]> {
        self.categorical_levels.get(column).map(Vec::as_slice)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Output column order: numeric columns then categorical columns.
    pub fn output_columns(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .chain(self.categorical_columns.iter())
            .cloned()
            .collect()
    }

    /// Number of columns in a transformed record.
    pub fn width(&self) -> usize {
        self.numeric_columns.len() + self.categorical_columns.len()
    }

    /// Whether `column` is one the store consumes.
    pub fn is_required(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
            || self.categorical_columns.iter().any(|c| c == column)
    }

    /// Numeric columns whose fitted scale is zero (constant in the fit data).
    pub fn zero_scale_columns(&self) -> Vec<&str> {
        self.numeric_columns
            .iter()
            .filter(|c| self.params.get(*c).map_or(false, |p| p.scale == 0.0))
            .map(String::as_str)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the store as a JSON artifact (atomic replace).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        artifact::write_json_atomic(path, self)
    }

    /// Load a store artifact and check its integrity.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let store: TransformStore = artifact::read_json(path)?;
        store.verify()?;
        Ok(store)
    }

    /// Check format version, parameter completeness, and fingerprint.
    pub fn verify(&self) -> Result<()> {
        artifact::ensure_format_version(self.format_version, "transform store")?;
        check_distinct(&self.numeric_columns, &self.categorical_columns)
            .map_err(|e| DriftlineError::Artifact(e.to_string()))?;
        if let Some(missing) = self
            .numeric_columns
            .iter()
            .find(|c| !self.params.contains_key(*c))
        {
            return Err(DriftlineError::Artifact(format!(
                "transform store lacks parameters for numeric column '{}'",
                missing
            )));
        }
        let expected = self.compute_fingerprint();
        if expected != self.fingerprint {
            return Err(DriftlineError::Artifact(format!(
                "transform store fingerprint mismatch: recorded {}, computed {}",
                self.fingerprint, expected
            )));
        }
        Ok(())
    }

    /// SHA-256 over columns, parameters (little-endian f64 bits), and levels.
    fn compute_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.format_version.to_le_bytes());
        for column in &self.numeric_columns {
            hasher.update(b"n:");
            hasher.update(column.as_bytes());
            hasher.update([0u8]);
            if let Some(p) = self.params.get(column) {
                hasher.update(p.mean.to_le_bytes());
                hasher.update(p.scale.to_le_bytes());
            }
        }
        for column in &self.categorical_columns {
            hasher.update(b"c:");
            hasher.update(column.as_bytes());
            hasher.update([0u8]);
            for level in self.categorical_levels.get(column).into_iter().flatten() {
                hasher.update(level.to_le_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

/// Mean and population standard deviation, accumulated in input order.
fn standardize(values: &[f64]) -> ScaleParams {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    ScaleParams {
        mean,
        scale: var.sqrt(),
    }
}

/// Column names must be unique within and across both lists.
fn check_distinct(numeric: &[String], categorical: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for column in numeric.iter().chain(categorical.iter()) {
        if !seen.insert(column.as_str()) {
            return Err(DriftlineError::Schema(format!(
                "column '{}' is listed more than once",
                column
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn training_table() -> Table {
        serde_json::from_str(
            r#"{
                "Fresh":   [100, 200, 300],
                "Milk":    [10, 20, 60],
                "Channel": [1, 2, 1]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn fit_matches_standard_scaler_convention() {
        let store =
            TransformStore::fit(&training_table(), &cols(&["Fresh"]), &[]).unwrap();
        let p = store.params("Fresh").unwrap();
        assert!((p.mean - 200.0).abs() < 1e-12);
        assert!((p.scale - 81.649_658_092_772_6).abs() < 1e-9);

        let out = store.apply(&RawRecord::new().with("Fresh", 100.0)).unwrap();
        assert!((out.get("Fresh").unwrap() + 1.224_744_871_391_589).abs() < 1e-9);
    }

    #[test]
    fn output_order_is_numeric_then_categorical() {
        let store = TransformStore::fit(
            &training_table(),
            &cols(&["Milk", "Fresh"]),
            &cols(&["Channel"]),
        )
        .unwrap();
        assert_eq!(store.output_columns(), cols(&["Milk", "Fresh", "Channel"]));

        let record = RawRecord::new()
            .with("Channel", 2i64)
            .with("Fresh", 200.0)
            .with("Milk", 30.0);
        let out = store.apply(&record).unwrap();
        assert_eq!(out.columns(), store.output_columns().as_slice());
        assert_eq!(out.values()[1], 0.0);
        assert_eq!(out.values()[2], 2.0);
    }

    #[test]
    fn categorical_levels_are_recorded_sorted() {
        let store =
            TransformStore::fit(&training_table(), &cols(&["Fresh"]), &cols(&["Channel"]))
                .unwrap();
        assert_eq!(store.categorical_levels("Channel"), Some(&[1, 2][..]));
    }

    #[test]
    fn fit_rejects_missing_and_duplicate_columns() {
        let table = training_table();
        assert!(matches!(
            TransformStore::fit(&table, &cols(&["Grocery"]), &[]),
            Err(DriftlineError::Schema(_))
        ));
        assert!(matches!(
            TransformStore::fit(&table, &cols(&["Fresh", "Fresh"]), &[]),
            Err(DriftlineError::Schema(_))
        ));
        assert!(matches!(
            TransformStore::fit(&table, &cols(&["Fresh"]), &cols(&["Fresh"])),
            Err(DriftlineError::Schema(_))
        ));
        assert!(matches!(
            TransformStore::fit(&Table::default(), &cols(&["Fresh"]), &[]),
            Err(DriftlineError::Schema(_))
        ));
    }

    #[test]
    fn apply_requires_fit_columns_but_ignores_extras() {
        let store =
            TransformStore::fit(&training_table(), &cols(&["Fresh", "Milk"]), &[]).unwrap();

        let missing = RawRecord::new().with("Fresh", 1.0);
        assert!(matches!(store.apply(&missing), Err(DriftlineError::Schema(_))));

        let extra = RawRecord::new()
            .with("Fresh", 1.0)
            .with("Milk", 2.0)
            .with("Unused", 3.0);
        assert_eq!(store.apply(&extra).unwrap().len(), 2);
    }

    #[test]
    fn zero_variance_column_propagates_non_finite() {
        let table: Table = serde_json::from_str(r#"{"Frozen": [5, 5, 5]}"#).unwrap();
        let store = TransformStore::fit(&table, &cols(&["Frozen"]), &[]).unwrap();
        assert_eq!(store.zero_scale_columns(), vec!["Frozen"]);

        let out = store.apply(&RawRecord::new().with("Frozen", 6.0)).unwrap();
        assert!(!out.values()[0].is_finite());
    }

    #[test]
    fn save_load_preserves_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transform.json");
        let store =
            TransformStore::fit(&training_table(), &cols(&["Fresh"]), &cols(&["Channel"]))
                .unwrap();
        store.save(&path).unwrap();

        let loaded = TransformStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.fingerprint().len(), 64);
    }

    #[test]
    fn save_load_is_bit_exact_for_awkward_floats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transform.json");
        let table: Table = serde_json::from_str(
            r#"{"Fresh": [0.0, 14729.1, 29458.2, 14187.3, 28916.4, 13645.5, 28374.6]}"#,
        )
        .unwrap();
        let store = TransformStore::fit(&table, &cols(&["Fresh"]), &[]).unwrap();
        store.save(&path).unwrap();

        let loaded = TransformStore::load(&path).unwrap();
        let (a, b) = (store.params("Fresh").unwrap(), loaded.params("Fresh").unwrap());
        assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        assert_eq!(a.scale.to_bits(), b.scale.to_bits());
        assert_eq!(loaded.fingerprint(), store.fingerprint());
    }

    #[test]
    fn apply_batch_matches_per_row_apply_and_names_bad_row() {
        let store =
            TransformStore::fit(&training_table(), &cols(&["Fresh"]), &cols(&["Channel"]))
                .unwrap();
        let rows = training_table();
        let batch = store.apply_batch(&rows).unwrap();
        assert_eq!(batch.len(), 3);
        for (row, out) in rows.rows().iter().zip(&batch) {
            assert_eq!(&store.apply(row).unwrap(), out);
        }

        let broken: Table =
            serde_json::from_str(r#"[{"Fresh": 1, "Channel": 1}, {"Fresh": 2}]"#).unwrap();
        match store.apply_batch(&broken).unwrap_err() {
            DriftlineError::Schema(msg) => assert!(msg.starts_with("row 1"), "{}", msg),
            other => panic!("expected Schema, got {:?}", other),
        }
    }

    #[test]
    fn tampered_parameters_fail_verification() {
        let store = TransformStore::fit(&training_table(), &cols(&["Fresh"]), &[]).unwrap();
        let mut doc = serde_json::to_value(&store).unwrap();
        doc["params"]["Fresh"]["mean"] = serde_json::json!(0.0);
        let tampered: TransformStore = serde_json::from_value(doc).unwrap();
        assert!(matches!(tampered.verify(), Err(DriftlineError::Artifact(_))));
    }
}
