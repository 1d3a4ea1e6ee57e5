// crates/driftline-rpc/src/server.rs
//
// HTTP server setup: PredictionServer and ServerConfig.
//
// The engine is loaded once before the server starts and shared read-only
// across request tasks. An uninitialized engine still serves: /predict
// answers 503 and /health reports why.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use driftline_inference::InferenceEngine;

use crate::handlers;

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Configuration for the prediction server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// PredictionServer
// ---------------------------------------------------------------------------

/// State shared with every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
}

/// HTTP front end for an [`InferenceEngine`].
#[derive(Clone)]
pub struct PredictionServer {
    config: ServerConfig,
    engine: Arc<InferenceEngine>,
}

impl std::fmt::Debug for PredictionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionServer")
            .field("config", &self.config)
            .field("engine_ready", &self.engine.is_ready())
            .finish()
    }
}

impl PredictionServer {
    pub fn new(config: ServerConfig, engine: Arc<InferenceEngine>) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router: routes, shared state, tracing and timeout layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/predict", post(handlers::predict::handle_predict))
            .route("/health", get(handlers::health::handle_health))
            .with_state(AppState {
                engine: self.engine.clone(),
            })
            .layer(TimeoutLayer::new(Duration::from_millis(
                self.config.request_timeout_ms,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!(
            "Driftline prediction server listening on http://{} (engine {})",
            addr,
            self.engine.state()
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Prediction server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use driftline_core::{ProbabilisticClassifier, Result, Table, TransformedRecord};
    use driftline_transform::TransformStore;

    struct FixedClassifier;

    impl ProbabilisticClassifier for FixedClassifier {
        fn classes(&self) -> &[String] {
            static CLASSES: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
            CLASSES.get_or_init(|| vec!["RegionA".to_string(), "RegionB".to_string()])
        }

        fn predict_proba(&self, _record: &TransformedRecord) -> Result<Vec<f64>> {
            Ok(vec![0.9, 0.1])
        }
    }

    fn ready_server() -> PredictionServer {
        let table: Table =
            serde_json::from_str(r#"{"Fresh": [100, 200, 300], "Channel": [1, 2, 2]}"#).unwrap();
        let store = TransformStore::fit(
            &table,
            &["Fresh".to_string()],
            &["Channel".to_string()],
        )
        .unwrap();
        let engine = InferenceEngine::from_parts(store, Arc::new(FixedClassifier)).unwrap();
        PredictionServer::new(ServerConfig::default(), Arc::new(engine))
    }

    fn unready_server() -> PredictionServer {
        PredictionServer::new(
            ServerConfig::default(),
            Arc::new(InferenceEngine::uninitialized("model artifact missing")),
        )
    }

    async fn post_predict(server: &PredictionServer, body: &str) -> (StatusCode, Value) {
        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/predict")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn predict_returns_label_and_probability() {
        let (status, body) =
            post_predict(&ready_server(), r#"{"Fresh": 100.0, "Channel": 2}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"prediction": "RegionA", "probability": 0.9}));
    }

    #[tokio::test]
    async fn invalid_requests_are_unprocessable() {
        let server = ready_server();
        for body in [
            r#"{"Fresh": 100.0}"#,
            r#"{"Fresh": 100.0, "Channel": 2, "Milk": 5.0}"#,
            r#"{"Fresh": "lots", "Channel": 2}"#,
            r#"{"Fresh": 100.0, "Channel": 7}"#,
            r#"[1, 2]"#,
        ] {
            let (status, error) = post_predict(&server, body).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
            assert_eq!(error["error"], "validation_error", "{}", body);
        }
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, error) = post_predict(&ready_server(), r#"{"Fresh": 1"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "malformed_json");
    }

    #[tokio::test]
    async fn unready_engine_answers_service_unavailable() {
        let (status, error) =
            post_predict(&unready_server(), r#"{"Fresh": 100.0, "Channel": 2}"#).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error["error"], "not_ready");
    }

    #[tokio::test]
    async fn health_reflects_engine_state() {
        for (server, expected, state) in [
            (ready_server(), StatusCode::OK, "ready"),
            (unready_server(), StatusCode::SERVICE_UNAVAILABLE, "uninitialized"),
        ] {
            let response = server
                .router()
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), expected);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["status"], state);
            assert_eq!(body["engine"]["state"], state);
        }
    }
}
