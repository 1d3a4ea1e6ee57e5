// crates/driftline-drift/src/detection.rs
//
// Per-feature drift detection against a reference summary.
//
// Each declared numeric column is tested independently with a two-sample
// test; a column drifts when p < threshold (strict). The batch is drifted if
// any column drifts. Columns are visited in declared order, so results and
// log output are reproducible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use driftline_core::{DriftlineError, Result, Table, TwoSampleTest};

use crate::ks::KolmogorovSmirnov;
use crate::reference::ReferenceSummary;
use crate::status::{DriftStatus, FeatureDrift, StatusStore};

/// Default significance threshold.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Cooperative cancellation for a running check, polled between features.
///
/// The flag is sticky: once tripped, every later check through the same
/// handle fails with `Aborted` until [`AbortHandle::reset`] clears it.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous abort so the detector can run again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Runs a two-sample test per feature and aggregates the verdicts.
#[derive(Debug)]
pub struct DriftDetector<T: TwoSampleTest = KolmogorovSmirnov> {
    test: T,
    /// Features with p-value strictly below this are drifted.
    threshold: f64,
    abort: AbortHandle,
}

impl DriftDetector<KolmogorovSmirnov> {
    /// Detector using the two-sample Kolmogorov-Smirnov test.
    pub fn new(threshold: f64) -> Result<Self> {
        Self::with_test(KolmogorovSmirnov, threshold)
    }
}

impl<T: TwoSampleTest> DriftDetector<T> {
    /// Detector using a custom two-sample test.
    ///
    /// Fails with `Config` unless `0 < threshold < 1`.
    pub fn with_test(test: T, threshold: f64) -> Result<Self> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(DriftlineError::Config(format!(
                "significance threshold must be in (0, 1), got {}",
                threshold
            )));
        }
        Ok(Self {
            test,
            threshold,
            abort: AbortHandle::new(),
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Handle that aborts an in-flight [`DriftDetector::check`].
    ///
    /// After an abort the detector refuses further checks until the handle
    /// is reset.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Compare `current` against `reference` for every column in `columns`.
    ///
    /// All columns are resolved on both sides before any test runs; a
    /// missing column fails the whole check with `Schema`. An abort between
    /// features fails with `Aborted`.
    pub fn check(
        &self,
        reference: &ReferenceSummary,
        current: &Table,
        columns: &[String],
    ) -> Result<DriftStatus> {
        if columns.is_empty() {
            return Err(DriftlineError::Schema("no columns to check for drift".to_string()));
        }
        if current.is_empty() {
            return Err(DriftlineError::Schema("current batch is empty".to_string()));
        }

        let mut samples = Vec::with_capacity(columns.len());
        for column in columns {
            let reference_sample = reference.sample(column)?;
            let current_sample = current
                .numeric_column(column)
                .map_err(|e| DriftlineError::Schema(format!("current batch: {}", e)))?;
            samples.push((column, reference_sample, current_sample));
        }

        tracing::info!(
            "Drift check ({}) over {} features, {} current rows, reference from '{}' (raw, pre-oversampling)",
            self.test.name(),
            columns.len(),
            current.len(),
            reference.source
        );

        let mut features = Vec::with_capacity(samples.len());
        for (done, (column, reference_sample, current_sample)) in samples.into_iter().enumerate() {
            if self.abort.is_aborted() {
                return Err(DriftlineError::Aborted(format!(
                    "drift check aborted after {} of {} features",
                    done,
                    columns.len()
                )));
            }

            let outcome = self.test.compare(reference_sample, &current_sample)?;
            let drifted = outcome.p_value < self.threshold;
            tracing::debug!(
                "Feature '{}': statistic={:.4}, p={:.6}",
                column,
                outcome.statistic,
                outcome.p_value
            );
            if drifted {
                tracing::warn!(
                    "Drift detected in '{}' (p={:.6} < {})",
                    column,
                    outcome.p_value,
                    self.threshold
                );
            }
            features.push(FeatureDrift {
                column: column.clone(),
                statistic: outcome.statistic,
                p_value: outcome.p_value,
                drifted,
            });
        }

        Ok(DriftStatus::from_features(self.threshold, features))
    }
}

/// Run a check and persist its status.
///
/// The status is persisted only when the check completes. On any failure
/// (schema, abort, test error) the previously persisted status is left as it
/// was and the run is logged as incomplete.
pub fn run_drift_check<T: TwoSampleTest>(
    detector: &DriftDetector<T>,
    reference: &ReferenceSummary,
    current: &Table,
    columns: &[String],
    store: &StatusStore,
) -> Result<DriftStatus> {
    let status = match detector.check(reference, current, columns) {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(
                "Drift check incomplete, previous status at {} left in place: {}",
                store.status_path().display(),
                e
            );
            return Err(e);
        }
    };

    store.persist(&status)?;
    if status.drift_detected {
        tracing::warn!(
            "Retraining signal raised: drifted features {:?}",
            status.drifted_features()
        );
    } else {
        tracing::info!("No drift detected across {} features", status.features.len());
    }
    Ok(status)
}
