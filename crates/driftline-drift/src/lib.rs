// crates/driftline-drift/src/lib.rs
//
// driftline-drift: decides whether the live input distribution has moved far
// enough from the training distribution to warrant retraining.
//
// A reference summary (raw per-feature samples) is captured once from the
// training features. Each check runs a two-sample test per declared numeric
// column, ORs the per-feature verdicts into one retrain signal, and persists
// the result atomically for external automation to poll.

pub mod detection;
pub mod ks;
pub mod reference;
pub mod status;

pub use detection::{run_drift_check, AbortHandle, DriftDetector, DEFAULT_SIGNIFICANCE_THRESHOLD};
pub use ks::KolmogorovSmirnov;
pub use reference::ReferenceSummary;
pub use status::{DriftStatus, FeatureDrift, StatusStore};
