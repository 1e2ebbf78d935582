//! Churn prediction server
//!
//! Thin HTTP layer over [`PredictService`](crate::inference::PredictService):
//! single and batch prediction, root and health routes, and a demo form at `/ui`.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::{BatchPredictionRequest, SinglePredictionRequest};
pub use state::AppState;

use crate::inference::{threshold_from_env, InferenceConfig, PredictService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub artifacts_dir: PathBuf,
    pub classification_threshold: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            artifacts_dir: std::env::var("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("artifacts")),
            classification_threshold: threshold_from_env(),
        }
    }
}

impl ServerConfig {
    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig::new()
            .with_artifacts_dir(&self.artifacts_dir)
            .with_threshold(self.classification_threshold)
    }
}

/// Load artifacts, bind and serve until ctrl+c.
/// Missing or unreadable artifacts fail here, before the listener is bound.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let service = PredictService::load(&config.inference_config())?;
    let state = Arc::new(AppState::new(Arc::new(service)));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        artifacts_dir = %config.artifacts_dir.display(),
        threshold = config.classification_threshold,
        started_at = %start_time.to_rfc3339(),
        "Churn prediction server starting"
    );
    info!(url = %format!("http://{}/ui", addr), "Demo UI available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            return;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_config_follows_server_config() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 9000,
            artifacts_dir: PathBuf::from("out"),
            classification_threshold: 0.5,
        };
        let inference = config.inference_config();
        assert_eq!(inference.artifacts_dir, PathBuf::from("out"));
        assert_eq!(inference.classification_threshold, 0.5);
    }
}
