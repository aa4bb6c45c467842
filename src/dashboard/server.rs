//! Dashboard HTTP server with axum router and graceful shutdown.

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::DashboardError;
use super::handlers::{
    get_events_sse, get_health, get_history, get_initial, get_recent, get_stream_status,
};
use super::state::AppState;
use crate::config::DashboardConfig;

/// Dashboard HTTP server over the event stream.
pub struct DashboardServer {
    /// Server configuration.
    config: DashboardConfig,
    /// Application state shared across handlers.
    state: AppState,
}

impl DashboardServer {
    /// Create a new dashboard server with default configuration.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            config: DashboardConfig::default(),
            state,
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: DashboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(get_health))
            .route("/api/events", get(get_recent))
            .route("/api/events/history", get(get_history))
            .route("/api/events/initial", get(get_initial))
            .route("/api/events/stream", get(get_events_sse))
            .route("/api/streams/status", get(get_stream_status))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Run the server until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> Result<(), DashboardError> {
        let addr = self.address();
        let cancel = self.state.cancel.clone();
        let app = self.build_router();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| DashboardError::BindError {
                address: addr.clone(),
                source,
            })?;

        tracing::info!(address = %addr, "Starting dashboard server");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Dashboard server shutting down gracefully");
            })
            .await
            .map_err(DashboardError::ServerError)
    }
}
