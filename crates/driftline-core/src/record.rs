// crates/driftline-core/src/record.rs
//
// Feature records: the raw observation a caller submits and the scaled
// record the model consumes. The two are distinct types; the feature
// pipeline converts one into the other and never edits either in place.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DriftlineError, Result};

/// A single cell value in a raw record.
///
/// JSON integers decode as `Integer`, everything else numeric as `Float`.
/// Numeric columns accept either; categorical columns require an integral value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Integer(i64),
    Float(f64),
}

impl FeatureValue {
    /// The value as a float, whichever way it was encoded.
    pub fn as_f64(&self) -> f64 {
        match self {
            FeatureValue::Integer(v) => *v as f64,
            FeatureValue::Float(v) => *v,
        }
    }

    /// The value as an integer code, if it is integral.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            FeatureValue::Integer(v) => Some(*v),
            FeatureValue::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            FeatureValue::Float(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Integer(v) => write!(f, "{}", v),
            FeatureValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Integer(v)
    }
}

// ---------------------------------------------------------------------------
// RawRecord
// ---------------------------------------------------------------------------

/// One untransformed observation: column name -> value.
///
/// Column order in the source document is irrelevant; lookups are by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    values: BTreeMap<String, FeatureValue>,
}

impl RawRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.values.get(column)
    }

    /// Whether the record carries the given column.
    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Column names in lexicographic order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric value of a required column.
    pub fn numeric(&self, column: &str) -> Result<f64> {
        self.get(column)
            .map(FeatureValue::as_f64)
            .ok_or_else(|| DriftlineError::Schema(format!("missing required column '{}'", column)))
    }

    /// Integer code of a required categorical column.
    pub fn categorical(&self, column: &str) -> Result<i64> {
        let value = self
            .get(column)
            .ok_or_else(|| DriftlineError::Schema(format!("missing required column '{}'", column)))?;
        value.as_code().ok_or_else(|| {
            DriftlineError::Schema(format!(
                "column '{}' must hold an integer code, got {}",
                column, value
            ))
        })
    }
}

impl FromIterator<(String, FeatureValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// TransformedRecord
// ---------------------------------------------------------------------------

/// A scaled record in the transform's fixed column order
/// (numeric columns first, then categorical columns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl TransformedRecord {
    /// Build a record from parallel column/value vectors.
    pub fn new(columns: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(DriftlineError::Schema(format!(
                "transformed record has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Dense feature vector in column order, as fed to the model.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
