// crates/driftline-inference/src/engine.rs
//
// InferenceEngine: model artifact + transform store behind one predict call.
//
// Lifecycle:
//   Uninitialized -> Ready     (both artifacts loaded and mutually consistent)
//   Uninitialized stays put    (any load failure; every request is refused)
//
// Once Ready the engine is never mutated. It is shared across request tasks
// via Arc and holds no per-request state.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use driftline_core::{DriftlineError, ProbabilisticClassifier, RawRecord, Result, Table};
use driftline_transform::{FeaturePipeline, TransformStore};

use crate::model::LinearClassifier;
use crate::prediction::{select_prediction, Prediction};

/// Where the engine loads its artifacts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Transform store artifact (JSON).
    pub transform_path: PathBuf,
    /// Model artifact (JSON).
    pub model_path: PathBuf,
}

/// Lifecycle state of the engine.
pub enum EngineState {
    /// Artifacts are missing or inconsistent; `reason` says why.
    Uninitialized { reason: String },
    /// Serving.
    Ready(ReadyState),
}

/// Everything a Ready engine holds. Read-only after construction.
pub struct ReadyState {
    pipeline: FeaturePipeline,
    model: Arc<dyn ProbabilisticClassifier>,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Uninitialized { .. } => write!(f, "Uninitialized"),
            EngineState::Ready(_) => write!(f, "Ready"),
        }
    }
}

/// Summary of the engine for health endpoints and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    /// "ready" or "uninitialized".
    pub state: String,
    /// Load failure, when uninitialized.
    pub reason: Option<String>,
    /// Known class labels, when ready.
    pub classes: Vec<String>,
    /// Fingerprint of the loaded transform store, when ready.
    pub transform_fingerprint: Option<String>,
}

/// Serves predictions for raw feature records.
pub struct InferenceEngine {
    state: EngineState,
}

impl fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("state", &self.state.to_string())
            .finish()
    }
}

impl InferenceEngine {
    /// An engine that refuses every request.
    pub fn uninitialized(reason: impl Into<String>) -> Self {
        Self {
            state: EngineState::Uninitialized {
                reason: reason.into(),
            },
        }
    }

    /// Load both artifacts from disk.
    ///
    /// Never fails: a load error leaves the engine Uninitialized, logged and
    /// reported by [`InferenceEngine::status`].
    pub fn load(config: &EngineConfig) -> Self {
        match Self::try_load(config) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::error!("Inference engine failed to load: {}", e);
                Self::uninitialized(e.to_string())
            }
        }
    }

    fn try_load(config: &EngineConfig) -> Result<Self> {
        tracing::info!("Loading transform store from {}", config.transform_path.display());
        let store = TransformStore::load(&config.transform_path)?;
        tracing::info!("Loading model from {}", config.model_path.display());
        let model = LinearClassifier::load(&config.model_path)?;
        tracing::info!("Model '{}' loaded", model.model_id());
        Self::from_parts(store, Arc::new(model))
    }

    /// Build a Ready engine from already-loaded parts.
    ///
    /// Fails with `Artifact` if the model declares a feature order or
    /// transform fingerprint that disagrees with the store.
    pub fn from_parts(
        store: TransformStore,
        model: Arc<dyn ProbabilisticClassifier>,
    ) -> Result<Self> {
        if model.classes().is_empty() {
            return Err(DriftlineError::Artifact("model has no classes".to_string()));
        }
        if let Some(order) = model.feature_order() {
            let expected = store.output_columns();
            if order != expected.as_slice() {
                return Err(DriftlineError::Artifact(format!(
                    "model feature order {:?} does not match transform output {:?}",
                    order, expected
                )));
            }
        }
        if let Some(fp) = model.transform_fingerprint() {
            if fp != store.fingerprint() {
                return Err(DriftlineError::Artifact(format!(
                    "model was trained behind transform {}, loaded transform is {}",
                    fp,
                    store.fingerprint()
                )));
            }
        }

        tracing::info!(
            "Engine state transition: Uninitialized -> Ready (transform {}, {} classes)",
            store.fingerprint(),
            model.classes().len()
        );
        Ok(Self {
            state: EngineState::Ready(ReadyState {
                pipeline: FeaturePipeline::new(Arc::new(store)),
                model,
            }),
        })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    pub fn status(&self) -> EngineStatus {
        match &self.state {
            EngineState::Uninitialized { reason } => EngineStatus {
                state: "uninitialized".to_string(),
                reason: Some(reason.clone()),
                classes: Vec::new(),
                transform_fingerprint: None,
            },
            EngineState::Ready(ready) => EngineStatus {
                state: "ready".to_string(),
                reason: None,
                classes: ready.model.classes().to_vec(),
                transform_fingerprint: Some(ready.pipeline.store().fingerprint().to_string()),
            },
        }
    }

    /// The loaded transform store, when ready.
    pub fn transform_store(&self) -> Option<&TransformStore> {
        match &self.state {
            EngineState::Ready(ready) => Some(ready.pipeline.store()),
            EngineState::Uninitialized { .. } => None,
        }
    }

    fn ready(&self) -> Result<&ReadyState> {
        match &self.state {
            EngineState::Ready(ready) => Ok(ready),
            EngineState::Uninitialized { reason } => {
                Err(DriftlineError::NotReady(reason.clone()))
            }
        }
    }

    /// Predict the class of one raw record.
    ///
    /// 1. Validate required columns, types, and categorical codes (`Validation`).
    /// 2. Transform; non-finite output is rejected (`NonFiniteFeature`).
    /// 3. Ask the model for class probabilities.
    /// 4. Take the argmax (first class wins ties) as label + confidence.
    pub fn predict(&self, record: &RawRecord) -> Result<Prediction> {
        let ready = self.ready()?;
        validate_record(ready.pipeline.store(), record)?;

        let transformed = ready.pipeline.transform(record)?;
        let proba = ready.model.predict_proba(&transformed)?;
        let prediction = select_prediction(ready.model.classes(), &proba)?;

        tracing::debug!(
            "Predicted '{}' with confidence {:.4}",
            prediction.label,
            prediction.confidence
        );
        Ok(prediction)
    }

    /// Predict every row of a table, failing on the first bad row.
    pub fn predict_batch(&self, data: &Table) -> Result<Vec<Prediction>> {
        data.rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                self.predict(row).map_err(|e| match e {
                    DriftlineError::Validation(msg) => {
                        DriftlineError::Validation(format!("row {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect()
    }
}

/// Check a raw record against the transform's schema before any model call.
///
/// Unknown extra columns are ignored here; the HTTP boundary rejects them.
pub fn validate_record(store: &TransformStore, record: &RawRecord) -> Result<()> {
    for column in store.numeric_columns() {
        let value = record.get(column).ok_or_else(|| {
            DriftlineError::Validation(format!("missing numeric field '{}'", column))
        })?;
        if !value.as_f64().is_finite() {
            return Err(DriftlineError::Validation(format!(
                "field '{}' must be a finite number",
                column
            )));
        }
    }
    for column in store.categorical_columns() {
        let value = record.get(column).ok_or_else(|| {
            DriftlineError::Validation(format!("missing categorical field '{}'", column))
        })?;
        let code = value.as_code().ok_or_else(|| {
            DriftlineError::Validation(format!(
                "field '{}' must be an integer code, got {}",
                column, value
            ))
        })?;
        if let Some(levels) = store.categorical_levels(column) {
            if !levels.is_empty() && !levels.contains(&code) {
                return Err(DriftlineError::Validation(format!(
                    "field '{}' has unknown category code {} (known: {:?})",
                    column, code, levels
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftline_core::TransformedRecord;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Classifier returning a fixed distribution regardless of input.
    struct FixedClassifier {
        classes: Vec<String>,
        proba: Vec<f64>,
    }

    impl ProbabilisticClassifier for FixedClassifier {
        fn classes(&self) -> &[String] {
            &self.classes
        }

        fn predict_proba(&self, _record: &TransformedRecord) -> Result<Vec<f64>> {
            Ok(self.proba.clone())
        }
    }

    fn store() -> TransformStore {
        let table: Table = serde_json::from_str(
            r#"{"Fresh": [100, 200, 300], "Frozen": [7, 7, 7], "Channel": [1, 2, 2]}"#,
        )
        .unwrap();
        TransformStore::fit(&table, &cols(&["Fresh", "Frozen"]), &cols(&["Channel"])).unwrap()
    }

    fn fresh_only_store() -> TransformStore {
        let table: Table =
            serde_json::from_str(r#"{"Fresh": [100, 200, 300], "Channel": [1, 2, 2]}"#).unwrap();
        TransformStore::fit(&table, &cols(&["Fresh"]), &cols(&["Channel"])).unwrap()
    }

    fn engine(proba: Vec<f64>, classes: &[&str]) -> InferenceEngine {
        InferenceEngine::from_parts(
            fresh_only_store(),
            Arc::new(FixedClassifier {
                classes: cols(classes),
                proba,
            }),
        )
        .unwrap()
    }

    #[test]
    fn uninitialized_engine_refuses_requests() {
        let engine = InferenceEngine::uninitialized("model file missing");
        assert!(!engine.is_ready());
        let record = RawRecord::new().with("Fresh", 1.0).with("Channel", 1i64);
        assert!(matches!(engine.predict(&record), Err(DriftlineError::NotReady(_))));
        assert_eq!(engine.status().state, "uninitialized");
    }

    #[test]
    fn load_failure_leaves_engine_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let engine = InferenceEngine::load(&EngineConfig {
            transform_path: dir.path().join("missing-transform.json"),
            model_path: dir.path().join("missing-model.json"),
        });
        assert!(!engine.is_ready());
        assert!(engine.status().reason.is_some());
    }

    #[test]
    fn predicts_label_and_confidence() {
        let engine = engine(vec![0.9, 0.1], &["RegionA", "RegionB"]);
        let record = RawRecord::new().with("Fresh", 100.0).with("Channel", 2i64);
        let p = engine.predict(&record).unwrap();
        assert_eq!(p.label, "RegionA");
        assert_eq!(p.confidence, 0.9);
    }

    #[test]
    fn tied_probabilities_pick_first_class() {
        let engine = engine(vec![0.5, 0.5], &["A", "B"]);
        let record = RawRecord::new().with("Fresh", 100.0).with("Channel", 1i64);
        assert_eq!(engine.predict(&record).unwrap().label, "A");
    }

    #[test]
    fn validation_runs_before_the_model() {
        let engine = engine(vec![0.9, 0.1], &["A", "B"]);

        let missing = RawRecord::new().with("Channel", 1i64);
        assert!(matches!(engine.predict(&missing), Err(DriftlineError::Validation(_))));

        let fractional = RawRecord::new().with("Fresh", 1.0).with("Channel", 1.5);
        assert!(matches!(engine.predict(&fractional), Err(DriftlineError::Validation(_))));

        let unknown_code = RawRecord::new().with("Fresh", 1.0).with("Channel", 9i64);
        assert!(matches!(engine.predict(&unknown_code), Err(DriftlineError::Validation(_))));
    }

    #[test]
    fn zero_variance_transform_rejects_prediction() {
        let engine = InferenceEngine::from_parts(
            store(),
            Arc::new(FixedClassifier {
                classes: cols(&["A", "B"]),
                proba: vec![0.6, 0.4],
            }),
        )
        .unwrap();
        let record = RawRecord::new()
            .with("Fresh", 100.0)
            .with("Frozen", 8.0)
            .with("Channel", 1i64);
        assert!(matches!(
            engine.predict(&record),
            Err(DriftlineError::NonFiniteFeature { .. })
        ));
    }

    #[test]
    fn mismatched_model_artifacts_are_refused() {
        let wrong_order = LinearClassifier::new(
            "m",
            cols(&["A", "B"]),
            cols(&["Channel", "Fresh"]),
            vec![vec![0.0, 0.0]],
            vec![0.0],
        )
        .unwrap();
        assert!(matches!(
            InferenceEngine::from_parts(fresh_only_store(), Arc::new(wrong_order)),
            Err(DriftlineError::Artifact(_))
        ));

        let wrong_fingerprint = LinearClassifier::new(
            "m",
            cols(&["A", "B"]),
            cols(&["Fresh", "Channel"]),
            vec![vec![0.0, 0.0]],
            vec![0.0],
        )
        .unwrap()
        .with_transform_fingerprint("deadbeef");
        assert!(matches!(
            InferenceEngine::from_parts(fresh_only_store(), Arc::new(wrong_fingerprint)),
            Err(DriftlineError::Artifact(_))
        ));
    }

    #[test]
    fn loads_consistent_artifacts_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_only_store();
        let model = LinearClassifier::new(
            "m",
            cols(&["A", "B"]),
            cols(&["Fresh", "Channel"]),
            vec![vec![1.0, 0.0]],
            vec![0.0],
        )
        .unwrap()
        .with_transform_fingerprint(store.fingerprint());

        let config = EngineConfig {
            transform_path: dir.path().join("transform.json"),
            model_path: dir.path().join("model.json"),
        };
        store.save(&config.transform_path).unwrap();
        model.save(&config.model_path).unwrap();

        let engine = InferenceEngine::load(&config);
        assert!(engine.is_ready());
        let status = engine.status();
        assert_eq!(status.classes, cols(&["A", "B"]));
        assert_eq!(status.transform_fingerprint.as_deref(), Some(store.fingerprint()));

        // Fresh = 300 scales positive, so the positive class wins.
        let record = RawRecord::new().with("Fresh", 300.0).with("Channel", 2i64);
        assert_eq!(engine.predict(&record).unwrap().label, "B");
    }
}
