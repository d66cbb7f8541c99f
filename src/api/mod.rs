//! HTTP API server for the FPL assistant

pub mod chat;
pub mod health;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::assistant::Assistant;
use crate::config::{Config, KeyStatus};

/// Shared state for API handlers
pub struct ApiState {
    pub assistant: Arc<Assistant>,
    /// Masked key summary computed at startup
    pub key_status: KeyStatus,
    /// Longest accepted `image` field
    pub max_image_chars: usize,
    /// Interval between SSE heartbeat events
    pub heartbeat: Duration,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
    max_body_bytes: usize,
}

impl ApiServer {
    /// Create a server around an assistant using the configured limits
    #[must_use]
    pub fn new(assistant: Arc<Assistant>, config: &Config) -> Self {
        let state = Arc::new(ApiState {
            assistant,
            key_status: config.key_status(),
            max_image_chars: config.limits.max_image_chars,
            heartbeat: config.server.heartbeat,
        });

        Self {
            state,
            port: config.server.port,
            static_dir: config.server.static_dir.clone(),
            max_body_bytes: config.limits.max_body_bytes,
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(chat::router(self.state.clone()))
            .merge(health::status_router(self.state.clone()))
            .merge(health::router());

        // Serve a web UI if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            provider = self.state.key_status.ai_provider,
            "API server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down API server");
}
