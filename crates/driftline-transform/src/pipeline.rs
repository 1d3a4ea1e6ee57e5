// crates/driftline-transform/src/pipeline.rs
//
// Feature pipeline: raw record -> transformed record through a shared,
// read-only TransformStore, with the finiteness postcondition enforced.

use std::sync::Arc;

use driftline_core::{DriftlineError, RawRecord, Result, Table, TransformedRecord};

use crate::scaler::TransformStore;

/// Applies a fitted transform and rejects non-finite output.
///
/// Cheap to clone; clones share the same store.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    store: Arc<TransformStore>,
}

impl FeaturePipeline {
    pub fn new(store: Arc<TransformStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TransformStore {
        &self.store
    }

    /// Transform one record and check every output value is finite.
    pub fn transform(&self, record: &RawRecord) -> Result<TransformedRecord> {
        let transformed = self.store.apply(record)?;
        ensure_finite(&transformed)?;
        Ok(transformed)
    }

    /// Transform every row of a table, failing on the first bad row.
    pub fn transform_batch(&self, data: &Table) -> Result<Vec<TransformedRecord>> {
        let transformed = self.store.apply_batch(data)?;
        for record in &transformed {
            ensure_finite(record)?;
        }
        Ok(transformed)
    }
}

/// Postcondition: every transformed value is finite.
///
/// A zero-variance column in the fit data surfaces here as a
/// `NonFiniteFeature` error naming the column.
pub fn ensure_finite(record: &TransformedRecord) -> Result<()> {
    match record
        .columns()
        .iter()
        .zip(record.values())
        .find(|(_, v)| !v.is_finite())
    {
        Some((column, _)) => Err(DriftlineError::NonFiniteFeature {
            column: column.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftline_core::FeatureValue;
    use proptest::prelude::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn pipeline() -> FeaturePipeline {
        let table: Table = serde_json::from_str(
            r#"{
                "Fresh":   [12669, 7057, 6353, 13265, 22615],
                "Milk":    [9656, 9810, 8808, 1196, 5410],
                "Grocery": [7561, 9568, 7684, 4221, 7198],
                "Channel": [2, 2, 2, 1, 2]
            }"#,
        )
        .unwrap();
        let store = TransformStore::fit(
            &table,
            &cols(&["Fresh", "Milk", "Grocery"]),
            &cols(&["Channel"]),
        )
        .unwrap();
        FeaturePipeline::new(Arc::new(store))
    }

    #[test]
    fn zero_variance_surfaces_as_non_finite_feature() {
        let table: Table = serde_json::from_str(r#"{"Frozen": [5, 5]}"#).unwrap();
        let store = TransformStore::fit(&table, &cols(&["Frozen"]), &[]).unwrap();
        let pipeline = FeaturePipeline::new(Arc::new(store));

        let err = pipeline
            .transform(&RawRecord::new().with("Frozen", 7.0))
            .unwrap_err();
        match err {
            DriftlineError::NonFiniteFeature { column } => assert_eq!(column, "Frozen"),
            other => panic!("expected NonFiniteFeature, got {:?}", other),
        }
    }

    #[test]
    fn batch_reports_offending_row() {
        let batch: Table = serde_json::from_str(
            r#"[
                {"Fresh": 1, "Milk": 2, "Grocery": 3, "Channel": 1},
                {"Fresh": 1, "Grocery": 3, "Channel": 1}
            ]"#,
        )
        .unwrap();
        let err = pipeline().transform_batch(&batch).unwrap_err();
        match err {
            DriftlineError::Schema(msg) => assert!(msg.starts_with("row 1"), "{}", msg),
            other => panic!("expected Schema, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn transform_is_deterministic(
            fresh in -1.0e6f64..1.0e6,
            milk in -1.0e6f64..1.0e6,
            grocery in -1.0e6f64..1.0e6,
            channel in 1i64..3,
        ) {
            let pipeline = pipeline();
            let record = RawRecord::new()
                .with("Fresh", fresh)
                .with("Milk", milk)
                .with("Grocery", grocery)
                .with("Channel", channel);
            let first = pipeline.transform(&record).unwrap();
            let second = pipeline.transform(&record).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn input_column_order_does_not_matter(
            values in proptest::collection::vec(-1.0e6f64..1.0e6, 3),
            channel in 1i64..3,
            rotation in 0usize..4,
        ) {
            let pipeline = pipeline();
            let mut entries: Vec<(String, FeatureValue)> = vec![
                ("Fresh".to_string(), values[0].into()),
                ("Milk".to_string(), values[1].into()),
                ("Grocery".to_string(), values[2].into()),
                ("Channel".to_string(), channel.into()),
            ];
            let reference: RawRecord = entries.iter().cloned().collect();
            entries.rotate_left(rotation);
            let permuted: RawRecord = entries.into_iter().collect();

            let a = pipeline.transform(&reference).unwrap();
            let b = pipeline.transform(&permuted).unwrap();
            prop_assert_eq!(a.columns(), &cols(&["Fresh", "Milk", "Grocery", "Channel"])[..]);
            prop_assert_eq!(a, b);
        }
    }
}
