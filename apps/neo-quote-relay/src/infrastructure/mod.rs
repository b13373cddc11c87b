//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer holds the concrete edges of the relay: the upstream Kotak Neo
//! HTTP adapters, the websocket fan-out server, and operational plumbing.

/// Broadcast channel adapters for quote distribution.
pub mod broadcast;

/// Configuration loaded from environment variables.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Kotak Neo HTTP adapters (credential bootstrap, LTP quote polling).
pub mod kotak;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Shared runtime counters and poller status.
pub mod state;

/// OpenTelemetry tracing integration.
pub mod telemetry;

/// WebSocket streaming server for front-end clients.
pub mod ws;
