//! Neo Quote Relay Binary
//!
//! Starts the LTP quote relay.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin neo-quote-relay
//! ```
//!
//! # Environment Variables
//!
//! All optional:
//! - `RELAY_WS_BIND`: WebSocket listen address (default: 0.0.0.0:8765)
//! - `RELAY_CREDENTIAL_URL`: Credential source endpoint (default: <http://127.0.0.1:5000/credentials>)
//! - `RELAY_CREDENTIAL_RETRY_SECS`: Delay between credential attempts (default: 5)
//! - `RELAY_POLL_INTERVAL_SECS`: Quote poll cadence (default: 1)
//! - `RELAY_IDLE_INTERVAL_SECS`: Cadence while there is nothing to poll (default: 2)
//! - `RELAY_ERROR_BACKOFF_SECS`: Cadence after an upstream transport error (default: 2)
//! - `RELAY_UPSTREAM_TIMEOUT_SECS`: Quote request timeout (default: 5)
//! - `RELAY_BROADCAST_CAPACITY`: Fan-out channel capacity (default: 1024)
//! - `RELAY_UNSUBSCRIBE_POLICY`: "remove" | "ignore" (default: remove)
//! - `HEALTH_BIND`: Health check HTTP address (default: 0.0.0.0:8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: neo-quote-relay)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use neo_quote_relay::infrastructure::broadcast::{DeliveryConfig, DeliveryHub};
use neo_quote_relay::infrastructure::health::{HealthServer, HealthServerState};
use neo_quote_relay::infrastructure::kotak::{
    CredentialBootstrap, CredentialClient, PollerSettings, QuotePoller, QuotesClient, SessionState,
};
use neo_quote_relay::infrastructure::state::RelayState;
use neo_quote_relay::infrastructure::telemetry;
use neo_quote_relay::infrastructure::ws::QuoteWsServer;
use neo_quote_relay::{RelayConfig, SubscriptionRegistry, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Neo Quote Relay"
    );

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = RelayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Shared state wired through every task
    let session = Arc::new(SessionState::new());
    let registry = Arc::new(SubscriptionRegistry::new(config.unsubscribe_policy));
    let hub = Arc::new(DeliveryHub::new(DeliveryConfig {
        quotes_capacity: config.broadcast_capacity,
    }));
    let relay_state = Arc::new(RelayState::new());

    // Credential bootstrap: retries the login service until a session shows up
    let bootstrap = CredentialBootstrap::new(
        CredentialClient::new(config.credential_url.clone())?,
        Arc::clone(&session),
        config.timings.credential_retry,
    );

    // Quote poller: drives the upstream LTP endpoint once credentials exist
    let poller = QuotePoller::new(
        QuotesClient::new(config.timings.upstream_timeout)?,
        Arc::clone(&session),
        Arc::clone(&registry),
        Arc::clone(&hub),
        Arc::clone(&relay_state),
        PollerSettings {
            poll_interval: config.timings.poll_interval,
            idle_interval: config.timings.idle_interval,
            error_backoff: config.timings.error_backoff,
        },
    );

    // WebSocket fan-out server
    let ws_server = QuoteWsServer::new(
        config.ws_bind.clone(),
        Arc::clone(&registry),
        Arc::clone(&hub),
        Arc::clone(&relay_state),
    );

    // Health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&session),
        Arc::clone(&registry),
        Arc::clone(&hub),
        Arc::clone(&relay_state),
    ));
    let health_server = HealthServer::new(
        config.health_bind.clone(),
        health_state,
        shutdown_token.clone(),
    );

    // Spawn long-running tasks
    let bootstrap_task = tokio::spawn(bootstrap.run(shutdown_token.clone()));
    let poller_task = tokio::spawn(poller.run(shutdown_token.clone()));

    let ws_cancel = shutdown_token.clone();
    let ws_task = tokio::spawn(async move {
        if let Err(e) = ws_server.run(ws_cancel).await {
            tracing::error!(error = %e, "WebSocket server error");
        }
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tracing::info!(
        ws_bind = %config.ws_bind,
        health_bind = %config.health_bind,
        "Quote relay ready"
    );

    await_shutdown(shutdown_token).await;

    // Drain the spawned tasks so in-flight work settles before the
    // telemetry guard flushes on drop.
    let drain = async {
        for (name, task) in [
            ("credential bootstrap", bootstrap_task),
            ("quote poller", poller_task),
            ("websocket server", ws_task),
            ("health server", health_task),
        ] {
            if let Err(e) = task.await {
                tracing::warn!(task = name, error = %e, "Task did not shut down cleanly");
            }
        }
    };
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timed out with tasks still running"
        );
    }

    tracing::info!("Quote relay stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &RelayConfig) {
    tracing::info!(
        ws_bind = %config.ws_bind,
        health_bind = %config.health_bind,
        credential_url = %config.credential_url,
        unsubscribe_policy = config.unsubscribe_policy.as_str(),
        "Configuration loaded"
    );
    tracing::debug!(
        credential_retry_secs = config.timings.credential_retry.as_secs(),
        poll_interval_secs = config.timings.poll_interval.as_secs(),
        idle_interval_secs = config.timings.idle_interval.as_secs(),
        error_backoff_secs = config.timings.error_backoff.as_secs(),
        upstream_timeout_secs = config.timings.upstream_timeout.as_secs(),
        broadcast_capacity = config.broadcast_capacity,
        "Relay timings"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
