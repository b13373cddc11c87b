//! Quote Delivery Hub
//!
//! Implements quote distribution using a tokio broadcast channel for
//! fan-out to every connected websocket client.
//!
//! # Architecture
//!
//! The poller publishes each [`NormalizedQuote`] once; every connection
//! holds its own receiver, so every client observes every quote in publish
//! order. A client that stops draining its receiver lags independently and
//! is the only one to lose quotes when the channel wraps around.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::quote::NormalizedQuote;

// =============================================================================
// Delivery Hub
// =============================================================================

/// Configuration for the quote delivery channel.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryConfig {
    /// Capacity of the quote broadcast channel.
    pub quotes_capacity: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            quotes_capacity: 1_024,
        }
    }
}

/// Central fan-out point between the poller and client connections.
///
/// # Example
///
/// ```rust
/// use neo_quote_relay::infrastructure::broadcast::{DeliveryConfig, DeliveryHub};
///
/// let hub = DeliveryHub::new(DeliveryConfig::default());
///
/// // Each connection takes its own receiver
/// let mut rx = hub.subscribe_quotes();
///
/// // The poller publishes quotes
/// // hub.deliver(quote);
/// ```
#[derive(Debug)]
pub struct DeliveryHub {
    quotes_tx: broadcast::Sender<NormalizedQuote>,
}

impl DeliveryHub {
    /// Create a new delivery hub with the given configuration.
    #[must_use]
    pub fn new(config: DeliveryConfig) -> Self {
        Self {
            quotes_tx: broadcast::channel(config.quotes_capacity).0,
        }
    }

    /// Create a new delivery hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DeliveryConfig::default())
    }

    /// Publish one quote to all connected receivers.
    ///
    /// Returns the number of receivers that got the quote, or `None` if no
    /// client is connected (the quote is dropped, which is fine: quotes are
    /// transient and the next cycle produces fresh ones).
    #[must_use]
    pub fn deliver(&self, quote: NormalizedQuote) -> Option<usize> {
        self.quotes_tx.send(quote).ok()
    }

    /// Get a new receiver carrying every quote published from now on.
    #[must_use]
    pub fn subscribe_quotes(&self) -> broadcast::Receiver<NormalizedQuote> {
        self.quotes_tx.subscribe()
    }

    /// Number of currently attached receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.quotes_tx.receiver_count()
    }
}

/// Shared delivery hub reference.
pub type SharedDeliveryHub = Arc<DeliveryHub>;

// =============================================================================
// Tests
// =============================================================================
