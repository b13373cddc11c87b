//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, relay status reporting, and Prometheus
//! metrics. Used by container orchestrators and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (checks credentials)
//! - `GET /metrics` - Prometheus metrics in text format

use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::domain::subscription::SubscriptionRegistry;
use crate::infrastructure::broadcast::SharedDeliveryHub;
use crate::infrastructure::kotak::SessionState;
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::state::{CycleStatus, RelayState};

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "starting".
    pub status: HealthStatus,
    /// Relay version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Upstream session status.
    pub session: SessionStatus,
    /// Quote poller status.
    pub poller: PollerStatus,
    /// Active client counts.
    pub clients: ClientStatus,
    /// Subscription statistics.
    pub subscriptions: SubscriptionStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Credentials published and the last upstream cycle succeeded.
    Healthy,
    /// Credentials published but the most recent cycle failed.
    Degraded,
    /// Waiting for the credential bootstrap to complete.
    Starting,
}

/// Upstream session status.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Whether session credentials have been published.
    pub ready: bool,
}

/// Quote poller status.
#[derive(Debug, Clone, Serialize)]
pub struct PollerStatus {
    /// Outcome of the most recent cycle.
    pub state: String,
    /// Total poll cycles since start.
    pub cycles: u64,
    /// Total quotes handed to the fan-out since start.
    pub quotes_delivered: u64,
    /// Most recent upstream error, if the last reachable cycle failed.
    pub last_error: Option<String>,
}

/// Active client information.
#[derive(Debug, Clone, Serialize)]
pub struct ClientStatus {
    /// Connected websocket clients.
    pub total: i32,
    /// Live broadcast receivers, one per connection.
    pub broadcast_receivers: usize,
}

/// Subscription statistics.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatus {
    /// Distinct instruments currently tracked.
    pub instruments: usize,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    session: Arc<SessionState>,
    registry: Arc<SubscriptionRegistry>,
    hub: SharedDeliveryHub,
    relay: Arc<RelayState>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(
        version: String,
        session: Arc<SessionState>,
        registry: Arc<SubscriptionRegistry>,
        hub: SharedDeliveryHub,
        relay: Arc<RelayState>,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            session,
            registry,
            hub,
            relay,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    bind_addr: String,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(
        bind_addr: String,
        state: Arc<HealthServerState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            bind_addr,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state);

        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.bind_addr.clone(), e.to_string()))?;

        tracing::info!(addr = %self.bind_addr, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Starting => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.session.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let session_ready = state.session.is_ready();
    let last_cycle = state.relay.last_cycle();

    HealthResponse {
        status: determine_health_status(session_ready, last_cycle),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        session: SessionStatus {
            ready: session_ready,
        },
        poller: PollerStatus {
            state: last_cycle.as_str().to_string(),
            cycles: state.relay.poll_cycles(),
            quotes_delivered: state.relay.quotes_delivered(),
            last_error: state.relay.last_error(),
        },
        clients: ClientStatus {
            total: state.relay.connected_clients(),
            broadcast_receivers: state.hub.receiver_count(),
        },
        subscriptions: SubscriptionStatus {
            instruments: state.registry.len(),
        },
    }
}

const fn determine_health_status(session_ready: bool, last_cycle: CycleStatus) -> HealthStatus {
    if !session_ready {
        return HealthStatus::Starting;
    }
    match last_cycle {
        CycleStatus::Error => HealthStatus::Degraded,
        CycleStatus::Starting | CycleStatus::Ok | CycleStatus::Idle => HealthStatus::Healthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind the listen address.
    #[error("failed to bind {0}: {1}")]
    BindFailed(String, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
