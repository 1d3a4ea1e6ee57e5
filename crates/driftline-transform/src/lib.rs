// crates/driftline-transform/src/lib.rs
//
// driftline-transform: the fit/apply contract that keeps preprocessing
// identical between training and serving.
//
// `TransformStore` holds the fitted standard-scaling parameters and the
// ordered column schema; `FeaturePipeline` applies a shared store to raw
// records and enforces the finite-output postcondition.

pub mod pipeline;
pub mod scaler;

pub use pipeline::{ensure_finite, FeaturePipeline};
pub use scaler::{ScaleParams, TransformStore};
