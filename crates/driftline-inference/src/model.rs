// crates/driftline-inference/src/model.rs
//
// LinearClassifier: a serialized multinomial logistic model.
//
// The training step is external; it exports per-class coefficient rows and
// intercepts in this versioned JSON layout. A single coefficient row means
// a binary logistic model whose positive class is `classes[1]`.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use driftline_core::artifact::{self, FORMAT_VERSION};
use driftline_core::{DriftlineError, ProbabilisticClassifier, Result, TransformedRecord};

/// Linear classifier with softmax (or sigmoid, for one row) output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    format_version: u32,
    /// Identifier of the trained model (e.g., "region-logreg-2024-05").
    model_id: String,
    /// Class labels in output order.
    classes: Vec<String>,
    /// Transformed column order the coefficients refer to.
    feature_order: Vec<String>,
    /// One row per class, or a single row for binary models.
    coefficients: Vec<Vec<f64>>,
    /// One intercept per coefficient row.
    intercepts: Vec<f64>,
    /// Fingerprint of the transform store the model was trained behind.
    #[serde(default)]
    transform_fingerprint: Option<String>,
}

impl LinearClassifier {
    /// Build and validate a classifier.
    pub fn new(
        model_id: impl Into<String>,
        classes: Vec<String>,
        feature_order: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            format_version: FORMAT_VERSION,
            model_id: model_id.into(),
            classes,
            feature_order,
            coefficients,
            intercepts,
            transform_fingerprint: None,
        };
        model.verify()?;
        Ok(model)
    }

    /// Record the transform fingerprint the model was trained behind.
    pub fn with_transform_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.transform_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Load a model artifact and check its shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let model: LinearClassifier = artifact::read_json(path)?;
        model.verify()?;
        Ok(model)
    }

    /// Write the model artifact (atomic replace).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        artifact::write_json_atomic(path, self)
    }

    /// Check version, class list, and coefficient dimensions.
    pub fn verify(&self) -> Result<()> {
        artifact::ensure_format_version(self.format_version, "model artifact")?;

        if self.classes.len() < 2 {
            return Err(DriftlineError::Artifact(format!(
                "model '{}' needs at least two classes, has {}",
                self.model_id,
                self.classes.len()
            )));
        }
        let unique: BTreeSet<&str> = self.classes.iter().map(String::as_str).collect();
        if unique.len() != self.classes.len() {
            return Err(DriftlineError::Artifact(format!(
                "model '{}' lists a class more than once",
                self.model_id
            )));
        }

        let rows = self.coefficients.len();
        let binary = rows == 1 && self.classes.len() == 2;
        if !binary && rows != self.classes.len() {
            return Err(DriftlineError::Artifact(format!(
                "model '{}' has {} coefficient rows for {} classes",
                self.model_id,
                rows,
                self.classes.len()
            )));
        }
        if self.intercepts.len() != rows {
            return Err(DriftlineError::Artifact(format!(
                "model '{}' has {} intercepts for {} coefficient rows",
                self.model_id,
                self.intercepts.len(),
                rows
            )));
        }
        let width = self.feature_order.len();
        if let Some(bad) = self.coefficients.iter().position(|row| row.len() != width) {
            return Err(DriftlineError::Artifact(format!(
                "model '{}' coefficient row {} has {} weights, expected {}",
                self.model_id,
                bad,
                self.coefficients[bad].len(),
                width
            )));
        }
        let all_finite = self
            .coefficients
            .iter()
            .flatten()
            .chain(self.intercepts.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(DriftlineError::Artifact(format!(
                "model '{}' contains non-finite parameters",
                self.model_id
            )));
        }
        Ok(())
    }

    fn decision_scores(&self, x: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect()
    }
}

impl ProbabilisticClassifier for LinearClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn feature_order(&self) -> Option<&[String]> {
        Some(&self.feature_order)
    }

    fn transform_fingerprint(&self) -> Option<&str> {
        self.transform_fingerprint.as_deref()
    }

    fn predict_proba(&self, record: &TransformedRecord) -> Result<Vec<f64>> {
        if record.columns() != self.feature_order.as_slice() {
            return Err(DriftlineError::Schema(format!(
                "model '{}' expects columns {:?}, got {:?}",
                self.model_id,
                self.feature_order,
                record.columns()
            )));
        }

        let scores = self.decision_scores(record.values());
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(&scores))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable softmax (max-shifted).
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn record(values: Vec<f64>) -> TransformedRecord {
        TransformedRecord::new(cols(&["Fresh", "Channel"]), values).unwrap()
    }

    #[test]
    fn softmax_probabilities_sum_to_one() {
        let model = LinearClassifier::new(
            "three-way",
            cols(&["1", "2", "3"]),
            cols(&["Fresh", "Channel"]),
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            vec![0.0, 0.0, 0.5],
        )
        .unwrap();
        let proba = model.predict_proba(&record(vec![2.0, 1.0])).unwrap();
        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(proba[0] > proba[1] && proba[1] > proba[2]);
        assert_eq!(model.predict(&record(vec![2.0, 1.0])).unwrap(), "1");
    }

    #[test]
    fn single_row_is_binary_logistic() {
        let model = LinearClassifier::new(
            "binary",
            cols(&["neg", "pos"]),
            cols(&["Fresh", "Channel"]),
            vec![vec![0.0, 0.0]],
            vec![0.0],
        )
        .unwrap();
        let proba = model.predict_proba(&record(vec![3.0, 1.0])).unwrap();
        assert_eq!(proba, vec![0.5, 0.5]);
        // Ties resolve to the first class.
        assert_eq!(model.predict(&record(vec![3.0, 1.0])).unwrap(), "neg");
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let too_few_rows = LinearClassifier::new(
            "bad",
            cols(&["a", "b", "c"]),
            cols(&["Fresh"]),
            vec![vec![1.0]],
            vec![0.0],
        );
        assert!(matches!(too_few_rows, Err(DriftlineError::Artifact(_))));

        let short_row = LinearClassifier::new(
            "bad",
            cols(&["a", "b"]),
            cols(&["Fresh", "Milk"]),
            vec![vec![1.0]],
            vec![0.0],
        );
        assert!(matches!(short_row, Err(DriftlineError::Artifact(_))));

        let duplicate_class = LinearClassifier::new(
            "bad",
            cols(&["a", "a"]),
            cols(&["Fresh"]),
            vec![vec![1.0]],
            vec![0.0],
        );
        assert!(matches!(duplicate_class, Err(DriftlineError::Artifact(_))));
    }

    #[test]
    fn wrong_column_order_is_schema_error() {
        let model = LinearClassifier::new(
            "binary",
            cols(&["neg", "pos"]),
            cols(&["Channel", "Fresh"]),
            vec![vec![1.0, 1.0]],
            vec![0.0],
        )
        .unwrap();
        assert!(matches!(
            model.predict_proba(&record(vec![1.0, 1.0])),
            Err(DriftlineError::Schema(_))
        ));
    }

    #[test]
    fn save_load_round_trip_keeps_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = LinearClassifier::new(
            "binary",
            cols(&["neg", "pos"]),
            cols(&["Fresh", "Channel"]),
            vec![vec![0.5, -0.25]],
            vec![0.1],
        )
        .unwrap()
        .with_transform_fingerprint("abc123");
        model.save(&path).unwrap();

        let loaded = LinearClassifier::load(&path).unwrap();
        assert_eq!(loaded.transform_fingerprint(), Some("abc123"));
        assert_eq!(loaded, model);
    }
}
