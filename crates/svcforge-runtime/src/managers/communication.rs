//! Inbound HTTP server of a composed service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Aggregated capability health; `503` when any capability is unreachable. |
//! | `GET`  | `/ready` | `200` once the orchestrator has published a serving report. |
//! | `GET`  | `/metrics` | Prometheus text exposition from the monitoring manager. |

use super::MonitoringManager;
use crate::catalog::BuildContext;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use svcforge_kernel::manager::{option_or, parse_option};
use svcforge_kernel::{HealthReport, HealthStatus, Manager, ManagerError, ManagerResult};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared state injected into every axum handler via [`State`] extractor.
#[derive(Clone)]
struct AppState {
    health: watch::Receiver<HealthReport>,
    monitoring: Option<Arc<MonitoringManager>>,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

/// Binds the service's HTTP listener and serves the health endpoints.
///
/// Options: `host` (default `0.0.0.0`), `port` (default `8080`; `0`
/// picks a free port, see [`local_addr`](Self::local_addr)) and
/// `shutdown_grace_secs` (default `5`), after which a server still draining
/// connections is aborted.
pub struct CommunicationManager {
    provider: String,
    bind: SocketAddr,
    shutdown_grace: Duration,
    health: watch::Receiver<HealthReport>,
    monitoring: Option<Arc<MonitoringManager>>,
    server: Mutex<Option<RunningServer>>,
}

impl CommunicationManager {
    pub fn create(ctx: &BuildContext<'_>) -> ManagerResult<Arc<dyn Manager>> {
        let options = ctx.options();
        let host = option_or(options, "host", "0.0.0.0");
        let port: u16 = parse_option(options, "port", 8080)?;
        let bind: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| ManagerError::invalid_option("host", format!("'{host}': {e}")))?;
        let grace_secs: u64 = parse_option(options, "shutdown_grace_secs", 5)?;

        Ok(Arc::new(Self {
            provider: ctx.provider().to_string(),
            bind,
            shutdown_grace: Duration::from_secs(grace_secs),
            health: ctx.health_feed(),
            monitoring: ctx.dependency_as::<MonitoringManager>("monitoring"),
            server: Mutex::new(None),
        }))
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(|s| s.addr)
    }

    fn router(&self) -> Router {
        let state = AppState {
            health: self.health.clone(),
            monitoring: self.monitoring.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }
}

#[async_trait::async_trait]
impl Manager for CommunicationManager {
    fn capability(&self) -> &str {
        "communication"
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    async fn start(&self) -> ManagerResult<()> {
        if self.server.lock().is_some() {
            return Ok(());
        }

        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .map_err(|e| ManagerError::Connect(format!("bind {}: {e}", self.bind)))?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await
        });

        info!(addr = %addr, "HTTP server listening");
        *self.server.lock() = Some(RunningServer {
            addr,
            shutdown,
            task,
        });
        Ok(())
    }

    async fn stop(&self) -> ManagerResult<()> {
        let Some(server) = self.server.lock().take() else {
            return Ok(());
        };
        server.shutdown.cancel();
        join_or_abort(server.task, self.shutdown_grace).await?;
        info!(addr = %server.addr, "HTTP server stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.server.lock().as_ref() {
            None => HealthStatus::NotApplicable,
            Some(server) if server.task.is_finished() => {
                warn!(addr = %server.addr, "HTTP server exited unexpectedly");
                HealthStatus::Unreachable
            }
            Some(_) => HealthStatus::Healthy,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Aborts the task when dropped; a no-op once it has finished.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Wait up to `grace` for the server task, aborting it on timeout or when
/// the wait itself is dropped.
async fn join_or_abort(
    mut task: JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> ManagerResult<()> {
    let _abort = AbortOnDrop(task.abort_handle());
    match tokio::time::timeout(grace, &mut task).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) => Err(ManagerError::Close(format!("server error: {e}"))),
        Ok(Err(e)) => Err(ManagerError::Close(format!("server task failed: {e}"))),
        Err(_) => {
            task.abort();
            warn!(grace = ?grace, "HTTP server did not drain in time, aborted");
            Err(ManagerError::Close(format!("server did not stop within {grace:?}")))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /health`: capability name to status.
async fn health_handler(State(state): State<AppState>) -> Response {
    let report = state.health.borrow().clone();
    let status = if report.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

/// `GET /ready`: readiness probe.
async fn ready_handler(State(state): State<AppState>) -> Response {
    let ready = {
        let report = state.health.borrow();
        !report.is_empty() && report.is_serving()
    };
    if ready {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting").into_response()
    }
}

/// `GET /metrics`: Prometheus exposition.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.monitoring {
        Some(monitoring) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            monitoring.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
