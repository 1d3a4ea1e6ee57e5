// crates/driftline-rpc/src/handlers/predict.rs
//
// POST /predict: one raw feature record in, label + probability out.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use driftline_core::{DriftlineError, FeatureValue, RawRecord};
use driftline_inference::InferenceEngine;

use crate::error::ApiError;
use crate::server::AppState;

// ---------------------------------------------------------------------------
// Predict
// ---------------------------------------------------------------------------

/// Response for a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Predicted class label.
    pub prediction: String,
    /// Probability of the predicted class.
    pub probability: f64,
}

/// Handle a prediction request.
///
/// The body is parsed here rather than through `Json<T>` so that syntax
/// errors (400) stay distinct from schema errors (422).
pub async fn handle_predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let record = decode_record(&body, &state.engine)?;
    let prediction = state.engine.predict(&record)?;
    Ok(Json(PredictResponse {
        prediction: prediction.label,
        probability: prediction.confidence,
    }))
}

/// Decode a request body into a raw record.
///
/// The body must be a JSON object of numbers. Fields the engine's transform
/// does not consume are rejected once the engine is ready.
pub fn decode_record(body: &[u8], engine: &InferenceEngine) -> Result<RawRecord, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::MalformedJson(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(DriftlineError::Validation(
            "request body must be a JSON object of feature values".to_string(),
        )
        .into());
    };

    let mut record = RawRecord::new();
    for (column, value) in fields {
        if let Some(store) = engine.transform_store() {
            if !store.is_required(&column) {
                return Err(DriftlineError::Validation(format!("unknown field '{}'", column)).into());
            }
        }
        let feature = match &value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => FeatureValue::Integer(i),
                None => FeatureValue::Float(n.as_f64().ok_or_else(|| {
                    DriftlineError::Validation(format!("field '{}' is not representable", column))
                })?),
            },
            other => {
                return Err(DriftlineError::Validation(format!(
                    "field '{}' must be a number, got {}",
                    column,
                    json_type(other)
                ))
                .into())
            }
        };
        record.insert(column, feature);
    }
    Ok(record)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
