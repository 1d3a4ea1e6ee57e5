// crates/driftline-drift/src/status.rs
//
// Drift status artifact and its durable store.
//
// The status is overwritten wholesale on each completed run. Writes go
// through a temp file in the target directory followed by a rename, so
// pollers see either the previous status or the new one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use driftline_core::artifact::{self, FORMAT_VERSION};
use driftline_core::Result;

/// Verdict for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    pub column: String,
    /// Test statistic (KS distance for the default test).
    pub statistic: f64,
    pub p_value: f64,
    /// `p_value < threshold`.
    pub drifted: bool,
}

/// Result of one completed drift check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftStatus {
    format_version: u32,
    /// Unique id of the run that produced this status.
    pub run_id: Uuid,
    pub checked_at: DateTime<Utc>,
    /// Significance threshold the verdicts were taken at.
    pub threshold: f64,
    /// True if any feature drifted.
    pub drift_detected: bool,
    /// Per-feature verdicts, in declared column order.
    pub features: Vec<FeatureDrift>,
}

impl DriftStatus {
    /// Aggregate per-feature verdicts: any drifted feature marks the batch.
    pub fn from_features(threshold: f64, features: Vec<FeatureDrift>) -> Self {
        let drift_detected = features.iter().any(|f| f.drifted);
        Self {
            format_version: FORMAT_VERSION,
            run_id: Uuid::now_v7(),
            checked_at: Utc::now(),
            threshold,
            drift_detected,
            features,
        }
    }

    pub fn p_values(&self) -> BTreeMap<String, f64> {
        self.features
            .iter()
            .map(|f| (f.column.clone(), f.p_value))
            .collect()
    }

    pub fn drifted_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.drifted)
            .map(|f| f.column.as_str())
            .collect()
    }
}

/// Where drift status is persisted.
#[derive(Debug, Clone)]
pub struct StatusStore {
    status_path: PathBuf,
    /// Optional plain-text `true`/`false` flag for older pollers.
    flag_path: Option<PathBuf>,
}

impl StatusStore {
    pub fn new(status_path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: status_path.into(),
            flag_path: None,
        }
    }

    pub fn with_flag_file(mut self, flag_path: impl Into<PathBuf>) -> Self {
        self.flag_path = Some(flag_path.into());
        self
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Atomically replace the persisted status (then the flag file, if any).
    pub fn persist(&self, status: &DriftStatus) -> Result<()> {
        artifact::write_json_atomic(&self.status_path, status)?;
        if let Some(flag) = &self.flag_path {
            let text = if status.drift_detected { "true" } else { "false" };
            artifact::write_text_atomic(flag, text)?;
        }
        tracing::info!(
            "Drift status {} persisted to {}",
            status.run_id,
            self.status_path.display()
        );
        Ok(())
    }

    /// Read the last persisted status, if one exists.
    pub fn load(&self) -> Result<Option<DriftStatus>> {
        if !self.status_path.exists() {
            return Ok(None);
        }
        let status: DriftStatus = artifact::read_json(&self.status_path)?;
        artifact::ensure_format_version(status.format_version, "drift status")?;
        Ok(Some(status))
    }
}
