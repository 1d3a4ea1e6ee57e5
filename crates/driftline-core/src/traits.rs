// crates/driftline-core/src/traits.rs

use serde::{Deserialize, Serialize};

use crate::error::{DriftlineError, Result};
use crate::record::TransformedRecord;

/// A trained classifier seen through the only capability serving needs:
/// a probability distribution over a fixed, ordered label set.
///
/// Implemented by driftline-inference (`LinearClassifier`) and by test stubs.
/// Any concrete algorithm satisfying this is interchangeable.
pub trait ProbabilisticClassifier: Send + Sync {
    /// Class labels, in the order `predict_proba` reports them.
    fn classes(&self) -> &[String];

    /// Probability of each class for one transformed record.
    fn predict_proba(&self, record: &TransformedRecord) -> Result<Vec<f64>>;

    /// Input column order the classifier was trained on, if it declares one.
    fn feature_order(&self) -> Option<&[String]> {
        None
    }

    /// Fingerprint of the transform the classifier was trained behind, if recorded.
    fn transform_fingerprint(&self) -> Option<&str> {
        None
    }

    /// Most probable label. Ties go to the class listed first.
    fn predict(&self, record: &TransformedRecord) -> Result<String> {
        let proba = self.predict_proba(record)?;
        let idx = first_argmax(&proba)
            .ok_or_else(|| DriftlineError::Model("empty probability vector".to_string()))?;
        self.classes()
            .get(idx)
            .cloned()
            .ok_or_else(|| DriftlineError::Model(format!("no class at index {}", idx)))
    }
}

/// Outcome of a two-sample distribution-equality test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Test statistic (for Kolmogorov–Smirnov, the sup distance between ECDFs).
    pub statistic: f64,
    /// Probability of a statistic at least this extreme if both samples
    /// share a distribution.
    pub p_value: f64,
}

/// Trait for two-sample tests used by drift detection.
///
/// Implemented by driftline-drift (`KolmogorovSmirnov`); tests substitute
/// stubs with fixed p-values.
pub trait TwoSampleTest: Send + Sync {
    /// Short name for logs and status artifacts.
    fn name(&self) -> &'static str;

    /// Compare a reference sample against a current sample.
    fn compare(&self, reference: &[f64], current: &[f64]) -> Result<TestOutcome>;
}

/// Index of the largest value, first occurrence winning ties.
///
/// Returns `None` for an empty slice. NaN entries never win.
pub fn first_argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b || v.is_nan() => {}
            None if v.is_nan() => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}
