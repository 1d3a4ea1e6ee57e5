// crates/driftline-core/src/lib.rs
//
// driftline-core: Core types, errors, traits, and artifact I/O for Driftline.
//
// This is the leaf crate every other crate in the workspace depends on.
// It defines feature records and tables, the workspace error type, the
// narrow capability traits for classifiers and two-sample tests, and the
// atomic JSON artifact helpers.

pub mod artifact;
pub mod error;
pub mod record;
pub mod table;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use driftline_core::RawRecord;`

pub use error::{DriftlineError, Result};
pub use record::{FeatureValue, RawRecord, TransformedRecord};
pub use table::Table;
pub use traits::{first_argmax, ProbabilisticClassifier, TestOutcome, TwoSampleTest};
