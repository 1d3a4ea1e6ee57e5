// crates/driftline-inference/src/lib.rs
//
// driftline-inference: the inference engine (transform + model + argmax),
// the serialized linear model artifact, and offline evaluation metrics.

pub mod engine;
pub mod evaluation;
pub mod model;
pub mod prediction;

pub use engine::{validate_record, EngineConfig, EngineState, EngineStatus, InferenceEngine};
pub use evaluation::{ClassificationMetrics, METRICS_FILE};
pub use model::LinearClassifier;
pub use prediction::{select_prediction, Prediction, PROBABILITY_TOLERANCE};
