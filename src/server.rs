//! HTTP server wiring
//!
//! Builds the axum router with trace and CORS layers and runs it on a
//! tokio listener. Kept separate from the handlers so tests can drive the
//! router against arbitrary settings.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, ApiState};
use crate::config::Settings;

/// Server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the application router for the given shared state.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(api::health_check))
        .route("/api/v1/ask", post(api::ask))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// The ask gateway server.
pub struct AskServer {
    config: ServerConfig,
    state: Arc<ApiState>,
}

impl AskServer {
    pub fn new(config: ServerConfig, settings: Settings) -> Self {
        Self {
            config,
            state: Arc::new(ApiState::new(settings)),
        }
    }

    /// Create the router.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Start serving (blocks until shutdown).
    pub async fn start(&self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("ask gateway listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
