// crates/driftline-cli/src/config.rs
//
// Runtime configuration for the driftline tool.
// Loaded from a TOML file or populated with defaults.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use driftline_core::{DriftlineError, Result};
use driftline_drift::StatusStore;
use driftline_inference::EngineConfig;
use driftline_rpc::ServerConfig;

/// Runtime configuration: artifact paths, feature schema, thresholds, and
/// the serving address.
#[derive(Debug, Clone, Deserialize)]
pub struct DriftlineConfig {
    /// Fitted transform store artifact.
    #[serde(default = "default_transform_path")]
    pub transform_path: String,

    /// Model artifact.
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Reference distribution summary.
    #[serde(default = "default_reference_path")]
    pub reference_path: String,

    /// Batch checked for drift.
    #[serde(default = "default_current_data_path")]
    pub current_data_path: String,

    /// Raw training features (fit input and reference source).
    #[serde(default = "default_training_data_path")]
    pub training_data_path: String,

    /// Labelled test table for offline evaluation.
    #[serde(default = "default_test_data_path")]
    pub test_data_path: String,

    /// Drift status artifact polled by retraining automation.
    #[serde(default = "default_status_path")]
    pub status_path: String,

    /// Optional plain `true`/`false` drift flag file.
    #[serde(default)]
    pub status_flag_path: Option<String>,

    /// Directory receiving classification_metrics.json.
    #[serde(default = "default_metrics_dir")]
    pub metrics_dir: String,

    /// Label column in the test table.
    #[serde(default = "default_target_column")]
    pub target_column: String,

    /// Numeric feature columns, in transform order.
    #[serde(default = "default_numeric_columns")]
    pub numeric_columns: Vec<String>,

    /// Categorical feature columns (integer codes), in transform order.
    #[serde(default = "default_categorical_columns")]
    pub categorical_columns: Vec<String>,

    /// p-value below which a feature counts as drifted.
    #[serde(default = "default_significance_threshold")]
    pub significance_threshold: f64,

    /// Host address for the prediction server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the prediction server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout for the prediction server.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Log level when RUST_LOG is unset: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_transform_path() -> String {
    "artifacts/transform.json".to_string()
}

fn default_model_path() -> String {
    "artifacts/model.json".to_string()
}

fn default_reference_path() -> String {
    "data/reference/reference_summary.json".to_string()
}

fn default_current_data_path() -> String {
    "data/raw/current.json".to_string()
}

fn default_training_data_path() -> String {
    "data/train_test/train.json".to_string()
}

fn default_test_data_path() -> String {
    "data/train_test/test.json".to_string()
}

fn default_status_path() -> String {
    "metrics/drift_status.json".to_string()
}

fn default_metrics_dir() -> String {
    "metrics".to_string()
}

fn default_target_column() -> String {
    "Region".to_string()
}

fn default_numeric_columns() -> Vec<String> {
    ["Fresh", "Milk", "Grocery", "Frozen", "Detergents_Paper", "Delicassen"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_categorical_columns() -> Vec<String> {
    vec!["Channel".to_string()]
}

fn default_significance_threshold() -> f64 {
    driftline_drift::DEFAULT_SIGNIFICANCE_THRESHOLD
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

pub fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DriftlineConfig {
    fn default() -> Self {
        Self {
            transform_path: default_transform_path(),
            model_path: default_model_path(),
            reference_path: default_reference_path(),
            current_data_path: default_current_data_path(),
            training_data_path: default_training_data_path(),
            test_data_path: default_test_data_path(),
            status_path: default_status_path(),
            status_flag_path: None,
            metrics_dir: default_metrics_dir(),
            target_column: default_target_column(),
            numeric_columns: default_numeric_columns(),
            categorical_columns: default_categorical_columns(),
            significance_threshold: default_significance_threshold(),
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl DriftlineConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns `Ok(None)` if the file does not exist, and a `Config` error if
    /// it exists but cannot be parsed.
    pub fn load(path: &str) -> Result<Option<Self>> {
        let path = expand_tilde(path);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let config: DriftlineConfig = toml::from_str(&contents)
            .map_err(|e| DriftlineError::Config(format!("{}: {}", path, e)))?;
        Ok(Some(config))
    }

    /// Reject values no command could run with.
    pub fn validate(&self) -> Result<()> {
        let t = self.significance_threshold;
        if !(t > 0.0 && t < 1.0) {
            return Err(DriftlineError::Config(format!(
                "significance_threshold must be in (0, 1), got {}",
                t
            )));
        }
        if self.numeric_columns.is_empty() {
            return Err(DriftlineError::Config(
                "numeric_columns must not be empty".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for column in self.numeric_columns.iter().chain(&self.categorical_columns) {
            if !seen.insert(column.as_str()) {
                return Err(DriftlineError::Config(format!(
                    "column '{}' is listed more than once",
                    column
                )));
            }
        }
        if seen.contains(self.target_column.as_str()) {
            return Err(DriftlineError::Config(format!(
                "target column '{}' is also listed as a feature",
                self.target_column
            )));
        }
        Ok(())
    }

    /// Expand a configured path (`~/` becomes the home directory).
    pub fn path(&self, raw: &str) -> PathBuf {
        PathBuf::from(expand_tilde(raw))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            transform_path: self.path(&self.transform_path),
            model_path: self.path(&self.model_path),
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn status_store(&self) -> StatusStore {
        let store = StatusStore::new(self.path(&self.status_path));
        match &self.status_flag_path {
            Some(flag) => store.with_flag_file(self.path(flag)),
            None => store,
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).display().to_string();
        }
    }
    path.to_string()
}
