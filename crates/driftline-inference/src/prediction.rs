// crates/driftline-inference/src/prediction.rs
//
// Turning a class-probability vector into a label + confidence.

use serde::{Deserialize, Serialize};

use driftline_core::{first_argmax, DriftlineError, Result};

/// Slack allowed when checking that probabilities lie in [0, 1] and sum to 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// The engine's answer for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Most probable class (first in class order on ties).
    pub label: String,
    /// Probability of `label`, in [0, 1].
    pub confidence: f64,
}

/// Select the most probable class.
///
/// The label is the argmax with ties broken by the first occurrence in
/// `classes`: probabilities `[0.5, 0.5]` over `["A", "B"]` give `"A"`.
/// Fails with `Model` if the vector does not line up with `classes`, holds a
/// non-finite or out-of-range entry, or does not sum to 1.
pub fn select_prediction(classes: &[String], proba: &[f64]) -> Result<Prediction> {
    if proba.len() != classes.len() {
        return Err(DriftlineError::Model(format!(
            "model returned {} probabilities for {} classes",
            proba.len(),
            classes.len()
        )));
    }
    if let Some(bad) = proba
        .iter()
        .find(|p| !p.is_finite() || **p < -PROBABILITY_TOLERANCE || **p > 1.0 + PROBABILITY_TOLERANCE)
    {
        return Err(DriftlineError::Model(format!(
            "probability {} is outside [0, 1]",
            bad
        )));
    }
    let total: f64 = proba.iter().sum();
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(DriftlineError::Model(format!(
            "probabilities sum to {}, expected 1",
            total
        )));
    }

    let idx = first_argmax(proba)
        .ok_or_else(|| DriftlineError::Model("empty probability vector".to_string()))?;
    Ok(Prediction {
        label: classes[idx].clone(),
        confidence: proba[idx].clamp(0.0, 1.0),
    })
}
