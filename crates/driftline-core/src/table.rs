// crates/driftline-core/src/table.rs
//
// Tabular batches of raw records (training features, current live data,
// labelled test data).
//
// On disk a table is either a flat CSV file with a header row (selected by
// the `.csv` extension) or JSON in one of two layouts:
//   - rows:    [{"Fresh": 12669, "Channel": 2}, ...]
//   - columns: {"Fresh": [12669, ...], "Channel": [2, ...]}
// All three decode to the same row-oriented `Table`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::artifact;
use crate::error::{DriftlineError, Result};
use crate::record::{FeatureValue, RawRecord};

/// A batch of raw records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRepr", into = "Vec<RawRecord>")]
pub struct Table {
    rows: Vec<RawRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TableRepr {
    Rows(Vec<RawRecord>),
    Columns(BTreeMap<String, Vec<FeatureValue>>),
}

impl TryFrom<TableRepr> for Table {
    type Error = DriftlineError;

    fn try_from(repr: TableRepr) -> Result<Self> {
        match repr {
            TableRepr::Rows(rows) => Ok(Table { rows }),
            TableRepr::Columns(columns) => Table::from_columns(columns),
        }
    }
}

impl From<Table> for Vec<RawRecord> {
    fn from(table: Table) -> Self {
        table.rows
    }
}

impl Table {
    pub fn from_rows(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }

    /// Build a table from equal-length columns.
    pub fn from_columns(columns: BTreeMap<String, Vec<FeatureValue>>) -> Result<Self> {
        let height = columns.values().next().map(Vec::len).unwrap_or(0);
        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != height) {
            return Err(DriftlineError::Schema(format!(
                "column '{}' has {} values, expected {}",
                name,
                col.len(),
                height
            )));
        }

        let rows: Vec<RawRecord> = (0..height)
            .map(|i| {
                columns
                    .iter()
                    .map(|(name, col)| (name.clone(), col[i]))
                    .collect::<RawRecord>()
            })
            .collect();
        Ok(Self { rows })
    }

    /// Read a table from a CSV or JSON file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if is_csv(path) {
            Ok(Self::from_rows(read_csv_rows(path)?))
        } else {
            artifact::read_json(path)
        }
    }

    pub fn rows(&self) -> &[RawRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of a numeric column, in row order.
    ///
    /// Fails with `Schema` if any row lacks the column.
    pub fn numeric_column(&self, column: &str) -> Result<Vec<f64>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.numeric(column).map_err(|_| {
                    DriftlineError::Schema(format!("row {} is missing column '{}'", i, column))
                })
            })
            .collect()
    }

    /// All codes of a categorical column, in row order.
    pub fn categorical_column(&self, column: &str) -> Result<Vec<i64>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.categorical(column)
                    .map_err(|e| DriftlineError::Schema(format!("row {}: {}", i, e)))
            })
            .collect()
    }
}

/// A class label as found in a labels file: string or number.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl LabelRepr {
    fn into_label(self) -> String {
        match self {
            LabelRepr::Text(s) => s,
            LabelRepr::Integer(v) => v.to_string(),
            LabelRepr::Float(v) => v.to_string(),
        }
    }
}

/// Read class labels. Numeric labels are rendered as strings so they compare
/// equal to a model's string class names.
///
/// A `.csv` file is a header row plus one label per line; the labels come
/// from `target_column`, or from the only column when the header names
/// something else. Any other file is a JSON array of labels.
pub fn load_labels(path: impl AsRef<Path>, target_column: &str) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !is_csv(path) {
        let raw: Vec<LabelRepr> = artifact::read_json(path)?;
        return Ok(raw.into_iter().map(LabelRepr::into_label).collect());
    }

    let rows: Vec<BTreeMap<String, LabelRepr>> = read_csv_rows(path)?;
    rows.into_iter()
        .enumerate()
        .map(|(i, mut row)| {
            let label = match row.remove(target_column) {
                Some(label) => Some(label),
                None if row.len() == 1 => row.into_values().next(),
                None => None,
            };
            label.map(LabelRepr::into_label).ok_or_else(|| {
                DriftlineError::Schema(format!(
                    "{} row {}: no '{}' column",
                    path.display(),
                    i,
                    target_column
                ))
            })
        })
        .collect()
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
}

/// Decode every data row of a headed CSV file.
fn read_csv_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DriftlineError::Io(format!("failed to read {}: {}", path.display(), e)))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()
        .map_err(|e| {
            DriftlineError::Serialization(format!("failed to decode {}: {}", path.display(), e))
        })
}
