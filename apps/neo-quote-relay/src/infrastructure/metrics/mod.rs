//! Prometheus Metrics Module
//!
//! Exposes relay metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Polling**: poll cycle outcomes and upstream request latency
//! - **Delivery**: quotes fanned out to websocket clients
//! - **Clients**: connected websocket clients and tracked instruments
//! - **Parsing**: malformed subscription symbols
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Polling counters
    describe_counter!(
        "relay_poll_cycles_total",
        "Total poll cycles by outcome (ok, skipped, error)"
    );
    describe_counter!(
        "relay_quotes_delivered_total",
        "Total quotes handed to the websocket fan-out"
    );

    // Parsing counters
    describe_counter!(
        "relay_symbol_parse_failures_total",
        "Total subscription symbols rejected as malformed or unknown"
    );

    // Client gauges
    describe_gauge!(
        "relay_connected_clients",
        "Number of connected websocket clients"
    );
    describe_gauge!(
        "relay_subscriptions",
        "Number of distinct instruments currently tracked"
    );

    // Latency histograms
    describe_histogram!(
        "relay_upstream_request_duration_seconds",
        "Round-trip time of upstream LTP quote requests"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for poll cycle outcomes.
#[derive(Debug, Clone, Copy)]
pub enum PollOutcome {
    /// Cycle reached upstream and decoded a quote batch.
    Ok,
    /// Cycle skipped: no credentials or nothing subscribed.
    Skipped,
    /// Cycle failed: transport, status, or decode error.
    Error,
}

impl PollOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// Record a completed poll cycle.
pub fn record_poll_cycle(outcome: PollOutcome) {
    counter!(
        "relay_poll_cycles_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record quotes handed to the fan-out.
pub fn record_quotes_delivered(count: u64) {
    counter!("relay_quotes_delivered_total").increment(count);
}

/// Record subscription symbols rejected during parsing.
pub fn record_symbol_parse_failures(count: usize) {
    let count = u64::try_from(count).unwrap_or(u64::MAX);
    counter!("relay_symbol_parse_failures_total").increment(count);
}

/// Update the connected websocket client count.
pub fn set_connected_clients(count: i32) {
    gauge!("relay_connected_clients").set(f64::from(count));
}

/// Update the tracked instrument count.
pub fn set_subscriptions(count: usize) {
    gauge!("relay_subscriptions").set(f64::from(u32::try_from(count).unwrap_or(u32::MAX)));
}

/// Record the round-trip time of one upstream quote request.
pub fn record_upstream_request_duration(duration: Duration) {
    histogram!("relay_upstream_request_duration_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_outcome_as_str() {
        assert_eq!(PollOutcome::Ok.as_str(), "ok");
        assert_eq!(PollOutcome::Skipped.as_str(), "skipped");
        assert_eq!(PollOutcome::Error.as_str(), "error");
    }
}
