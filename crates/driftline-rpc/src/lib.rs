// crates/driftline-rpc/src/lib.rs
//
// driftline-rpc: HTTP prediction server and handlers for Driftline.
//
// An axum router over a shared, read-only InferenceEngine:
//   POST /predict  one raw feature record -> {"prediction", "probability"}
//   GET  /health   engine readiness

pub mod error;
pub mod handlers;
pub mod server;

// Re-export the main server types for ergonomic access.
pub use error::{ApiError, ErrorBody};
pub use server::{AppState, PredictionServer, ServerConfig};
