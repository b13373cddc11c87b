//! Client Wire Protocol
//!
//! Inbound message types for the websocket surface. Clients speak a
//! two-verb protocol; everything outbound is a bare quote object, encoded
//! straight from [`NormalizedQuote`](crate::domain::quote::NormalizedQuote).
//!
//! # Wire Format (JSON)
//! ```json
//! {"action": "subscribe", "symbols": ["NSE|11536", "NFO 54321"]}
//! {"action": "unsubscribe", "symbols": ["NSE|11536"]}
//! ```

use serde::Deserialize;

/// Verb of a client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    /// Add the listed symbols to the shared registry.
    Subscribe,
    /// Drop the listed symbols, subject to the configured policy.
    Unsubscribe,
}

impl SubscriptionAction {
    /// Stable string form for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

/// One inbound request frame.
///
/// A missing `symbols` field is the same as an empty list; the request
/// parses and applies as a no-op.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRequest {
    /// What to do with the symbols.
    pub action: SubscriptionAction,
    /// Raw symbol strings, parsed individually by the registry.
    #[serde(default)]
    pub symbols: Vec<String>,
}
