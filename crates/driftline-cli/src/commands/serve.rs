// crates/driftline-cli/src/commands/serve.rs
//
// `driftline serve`: load the inference engine and start the HTTP server.

use std::sync::Arc;

use clap::Args;

use driftline_inference::InferenceEngine;
use driftline_rpc::PredictionServer;

use crate::config::DriftlineConfig;

/// Serve command.
#[derive(Debug, Args)]
pub struct ServeCmd {
    /// Port to listen on (overrides `port`).
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides `host`).
    #[arg(long)]
    pub host: Option<String>,
}

/// Run the serve command.
///
/// A failed artifact load does not stop the server: it comes up with an
/// uninitialized engine, answering 503 until restarted with good artifacts.
pub async fn run(cmd: &ServeCmd, config: &DriftlineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut server_config = config.server_config();
    if let Some(port) = cmd.port {
        server_config.port = port;
    }
    if let Some(host) = &cmd.host {
        server_config.host = host.clone();
    }

    let engine = InferenceEngine::load(&config.engine_config());
    if !engine.is_ready() {
        tracing::warn!("Serving with an uninitialized engine; /predict will answer 503");
    }

    let server = PredictionServer::new(server_config, Arc::new(engine));
    server
        .start(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
            }
        })
        .await
}
