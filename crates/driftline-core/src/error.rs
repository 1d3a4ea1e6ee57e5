// crates/driftline-core/src/error.rs

use thiserror::Error;

/// Workspace-wide error type for Driftline.
#[derive(Debug, Error)]
pub enum DriftlineError {
    /// A required column is absent, or an input has the wrong shape
    /// (raw record, reference summary, current batch, transform fit input).
    #[error("Schema error: {0}")]
    Schema(String),

    /// A well-formed request that is semantically invalid (wrong type,
    /// unknown category code, unexpected field).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Inference was requested before the engine finished loading.
    #[error("Engine not ready: {0}")]
    NotReady(String),

    /// A transformed feature came out NaN or infinite, usually from a
    /// zero-variance column in the fitted transform.
    #[error("Non-finite value for feature '{column}' after transform")]
    NonFiniteFeature { column: String },

    /// The model produced output that breaks its probability contract.
    #[error("Model error: {0}")]
    Model(String),

    /// An artifact is unreadable, has an unsupported format version, or does
    /// not match its companion artifacts.
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// A drift check was cancelled before it finished.
    #[error("Aborted: {0}")]
    Aborted(String),

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DriftlineError>;

impl From<serde_json::Error> for DriftlineError {
    fn from(e: serde_json::Error) -> Self {
        DriftlineError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for DriftlineError {
    fn from(e: std::io::Error) -> Self {
        DriftlineError::Io(e.to_string())
    }
}

impl DriftlineError {
    /// Short machine-readable tag, used in HTTP error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DriftlineError::Schema(_) => "schema_error",
            DriftlineError::Validation(_) => "validation_error",
            DriftlineError::NotReady(_) => "not_ready",
            DriftlineError::NonFiniteFeature { .. } => "non_finite_feature",
            DriftlineError::Model(_) => "model_error",
            DriftlineError::Artifact(_) => "artifact_error",
            DriftlineError::Aborted(_) => "aborted",
            DriftlineError::Config(_) => "config_error",
            DriftlineError::Io(_) => "io_error",
            DriftlineError::Serialization(_) => "serialization_error",
        }
    }
}
