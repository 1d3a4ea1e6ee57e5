// crates/driftline-rpc/src/error.rs
//
// ApiError: the single place engine errors become HTTP status codes.
//
//   malformed JSON body                    -> 400
//   Validation / Schema                    -> 422
//   NotReady                               -> 503 + Retry-After
//   NonFiniteFeature / Model / everything  -> 500
//
// Bodies are always `{"error": <kind>, "message": <text>}`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use driftline_core::DriftlineError;

/// Seconds a client should wait before retrying against an unready engine.
pub const RETRY_AFTER_SECS: u64 = 5;

/// JSON error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Request body was not valid JSON.
    MalformedJson(String),
    /// Error raised by the engine or by request decoding.
    Engine(DriftlineError),
}

impl From<DriftlineError> for ApiError {
    fn from(e: DriftlineError) -> Self {
        ApiError::Engine(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(e) => match e {
                DriftlineError::Validation(_) | DriftlineError::Schema(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                DriftlineError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::MalformedJson(msg) => ErrorBody {
                error: "malformed_json".to_string(),
                message: msg.clone(),
            },
            ApiError::Engine(e) => ErrorBody {
                error: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            tracing::warn!("Request failed ({}): {}", status, body.message);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, body.message);
        }

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}
