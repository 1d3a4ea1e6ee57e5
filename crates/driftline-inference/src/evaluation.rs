// crates/driftline-inference/src/evaluation.rs
//
// Offline evaluation: accuracy and support-weighted precision, recall and F1
// over a labelled test set, persisted as classification_metrics.json.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use driftline_core::artifact;
use driftline_core::{DriftlineError, Result};

/// File name written under the metrics directory.
pub const METRICS_FILE: &str = "classification_metrics.json";

/// Headline classification metrics. Per-class scores are averaged weighted
/// by each class's support in the true labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

#[derive(Default)]
struct ClassCounts {
    true_positive: usize,
    predicted: usize,
    support: usize,
}

/// Ratio with an undefined denominator scored as zero.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationMetrics {
    /// Score predicted labels against true labels.
    ///
    /// Fails with `Schema` if the slices differ in length or are empty.
    pub fn compute(y_true: &[String], y_pred: &[String]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(DriftlineError::Schema(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(DriftlineError::Schema(
                "cannot evaluate an empty test set".to_string(),
            ));
        }

        let mut counts: BTreeMap<&str, ClassCounts> = BTreeMap::new();
        let mut correct = 0usize;
        for (t, p) in y_true.iter().zip(y_pred) {
            counts.entry(t.as_str()).or_default().support += 1;
            counts.entry(p.as_str()).or_default().predicted += 1;
            if t == p {
                correct += 1;
                counts.entry(t.as_str()).or_default().true_positive += 1;
            }
        }

        let total = y_true.len();
        let mut precision = 0.0;
        let mut recall = 0.0;
        let mut f1 = 0.0;
        for c in counts.values() {
            let weight = ratio(c.support, total);
            let p = ratio(c.true_positive, c.predicted);
            let r = ratio(c.true_positive, c.support);
            let f = if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) };
            precision += weight * p;
            recall += weight * r;
            f1 += weight * f;
        }

        Ok(Self {
            accuracy: ratio(correct, total),
            precision,
            recall,
            f1_score: f1,
        })
    }

    /// Write `classification_metrics.json` into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(METRICS_FILE);
        artifact::write_json_atomic(&path, self)?;
        tracing::info!("Classification metrics written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn perfect_predictions_score_one() {
        let y = labels(&["1", "2", "3", "3"]);
        let m = ClassificationMetrics::compute(&y, &y).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.f1_score, 1.0);
    }

    #[test]
    fn weighted_averages_follow_support() {
        // Class A: support 3, predicted 2 (both correct) -> p=1, r=2/3.
        // Class B: support 1, predicted 2 (one correct) -> p=1/2, r=1.
        let y_true = labels(&["A", "A", "A", "B"]);
        let y_pred = labels(&["A", "A", "B", "B"]);
        let m = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();

        assert!(close(m.accuracy, 0.75));
        assert!(close(m.precision, 0.75 * 1.0 + 0.25 * 0.5));
        assert!(close(m.recall, 0.75 * (2.0 / 3.0) + 0.25 * 1.0));
        let f1_a = 2.0 * 1.0 * (2.0 / 3.0) / (1.0 + 2.0 / 3.0);
        let f1_b = 2.0 * 0.5 * 1.0 / 1.5;
        assert!(close(m.f1_score, 0.75 * f1_a + 0.25 * f1_b));
    }

    #[test]
    fn class_never_predicted_scores_zero_precision() {
        let y_true = labels(&["A", "B"]);
        let y_pred = labels(&["A", "A"]);
        let m = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();
        // A: p=1/2, r=1; B: never predicted, never correct.
        assert!(close(m.precision, 0.25));
        assert!(close(m.recall, 0.5));
    }

    #[test]
    fn mismatched_or_empty_inputs_are_rejected() {
        assert!(matches!(
            ClassificationMetrics::compute(&labels(&["A"]), &labels(&[])),
            Err(DriftlineError::Schema(_))
        ));
        assert!(matches!(
            ClassificationMetrics::compute(&[], &[]),
            Err(DriftlineError::Schema(_))
        ));
    }

    #[test]
    fn save_writes_metrics_file() {
        let dir = tempfile::tempdir().unwrap();
        let m = ClassificationMetrics::compute(&labels(&["A", "B"]), &labels(&["A", "B"])).unwrap();
        let path = m.save(dir.path().join("metrics")).unwrap();
        assert!(path.ends_with(METRICS_FILE));
        let loaded: ClassificationMetrics = artifact::read_json(&path).unwrap();
        assert_eq!(loaded, m);
    }
}
