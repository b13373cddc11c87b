//! Relay Runtime State
//!
//! Shared counters and status flags written by the poller and the
//! websocket server and read by the health endpoints. All fields are
//! lock-free or guarded by short critical sections so writers never
//! block the hot path.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

// =============================================================================
// Poll Cycle Status
// =============================================================================

/// Outcome of the most recent poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleStatus {
    /// No cycle has completed yet.
    #[default]
    Starting,
    /// Last cycle fetched quotes from upstream.
    Ok,
    /// Last cycle was skipped: no credentials or nothing subscribed.
    Idle,
    /// Last cycle failed against upstream.
    Error,
}

impl CycleStatus {
    /// Stable string form used in the health response.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ok => "ok",
            Self::Idle => "idle",
            Self::Error => "error",
        }
    }
}

// =============================================================================
// Relay State
// =============================================================================

/// Tracks relay activity for health reporting.
#[derive(Debug, Default)]
pub struct RelayState {
    connected_clients: AtomicI32,
    poll_cycles: AtomicU64,
    quotes_delivered: AtomicU64,
    last_cycle: parking_lot::RwLock<CycleStatus>,
    last_error: parking_lot::RwLock<Option<String>>,
}

impl RelayState {
    /// Create state with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a client connection. Returns the new total.
    pub fn client_connected(&self) -> i32 {
        self.connected_clients.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a client disconnection. Returns the new total.
    pub fn client_disconnected(&self) -> i32 {
        self.connected_clients.fetch_sub(1, Ordering::Relaxed) - 1
    }

    /// Record a completed poll cycle that reached upstream.
    pub fn record_cycle_ok(&self, delivered: u64) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
        self.quotes_delivered.fetch_add(delivered, Ordering::Relaxed);
        *self.last_cycle.write() = CycleStatus::Ok;
        *self.last_error.write() = None;
    }

    /// Record a cycle skipped for lack of credentials or subscriptions.
    pub fn record_cycle_idle(&self) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
        *self.last_cycle.write() = CycleStatus::Idle;
    }

    /// Record a cycle that failed against upstream.
    pub fn record_cycle_error(&self, message: String) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
        *self.last_cycle.write() = CycleStatus::Error;
        *self.last_error.write() = Some(message);
    }

    /// Current connected client count.
    #[must_use]
    pub fn connected_clients(&self) -> i32 {
        self.connected_clients.load(Ordering::Relaxed)
    }

    /// Total poll cycles since start, including skipped ones.
    #[must_use]
    pub fn poll_cycles(&self) -> u64 {
        self.poll_cycles.load(Ordering::Relaxed)
    }

    /// Total quotes handed to the delivery hub since start.
    #[must_use]
    pub fn quotes_delivered(&self) -> u64 {
        self.quotes_delivered.load(Ordering::Relaxed)
    }

    /// Status of the most recent poll cycle.
    #[must_use]
    pub fn last_cycle(&self) -> CycleStatus {
        *self.last_cycle.read()
    }

    /// Message from the most recent upstream failure, if the last
    /// reachable cycle failed.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }
}
