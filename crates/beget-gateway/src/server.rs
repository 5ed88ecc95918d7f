//! Axum-based HTTP ingestion server.
//!
//! [`GatewayServer`] wires the topic allowlist, request validator and
//! producer into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/produce` | Validate a JSON envelope and publish it. |
//! | `GET`  | `/healthz` | Liveness check, always `200 OK`. |
//!
//! Any other path is `404`; any other method on a known path is `405`.

use crate::error::ServeError;
use crate::handlers::{health_router, produce_router};
use crate::state::AppState;
use crate::validate::RequestValidator;
use axum::Router;
use axum::http::StatusCode;
use beget_kernel::{Config, ConfigError, Producer, TopicRegistry};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP server bound to one configuration and one producer.
pub struct GatewayServer {
    config: Arc<Config>,
    state: AppState,
}

impl GatewayServer {
    /// Build the server state. Fails when the topic allowlist is invalid.
    pub fn new(config: Arc<Config>, producer: Arc<dyn Producer>) -> Result<Self, ConfigError> {
        let topics = Arc::new(TopicRegistry::from_config(&config)?);
        let validator = Arc::new(RequestValidator::new(topics));
        let state = AppState::new(validator, producer, config.server.request_timeout());
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the axum [`Router`] with request tracing on every route.
    ///
    /// `/healthz` is wrapped in a [`TimeoutLayer`]. `/produce` applies the
    /// request timeout itself, to the read-and-validate phase only, so an
    /// accepted message always gets its `200 OK`.
    pub fn build_app(&self) -> Router {
        let request_timeout = self.config.server.request_timeout();
        let health = health_router().layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

        Router::new()
            .merge(produce_router())
            .merge(health)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self.state.clone())
    }

    /// Serve on `listener` until `shutdown` resolves, then stop accepting
    /// connections and wait up to `server.shutdown_grace_secs` for in-flight
    /// requests.
    ///
    /// Returns [`ServeError::GraceExpired`] when the grace period runs out.
    /// The producer is left open; closing it is up to the caller.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let grace = self.config.server.shutdown_grace();
        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "beget gateway listening");
        }

        let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, self.build_app())
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = signalled_tx.send(());
            })
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => return result.map_err(ServeError::Io),
            _ = signalled_rx => {}
        }

        info!(
            grace_ms = grace.as_millis() as u64,
            "shutting down, draining in-flight requests"
        );
        match tokio::time::timeout(grace, server).await {
            Ok(result) => result.map_err(ServeError::Io),
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "in-flight requests did not finish in time");
                Err(ServeError::GraceExpired(grace))
            }
        }
    }
}

/// Resolves on `SIGINT` (Ctrl-C) or, on Unix, `SIGTERM`.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
