#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Neo Quote Relay - LTP Quote Fan-Out
//!
//! A websocket relay that polls the Kotak Neo REST quotes API for last
//! traded prices and fans the normalized quotes out to multiple trading
//! front-end clients over a single upstream session.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core relay types with no I/O
//!   - `instrument`: Exchange segments and instrument keys
//!   - `quote`: Normalized quote payload (`tk`/`lp`/`pc`/`v`)
//!   - `subscription`: Shared subscription registry
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `kotak`: Credential bootstrap and LTP polling against Kotak Neo
//!   - `broadcast`: Channel-based quote distribution
//!   - `ws`: WebSocket server for front-end clients
//!   - `config`: Environment-driven configuration
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! Login Service ──► SessionState ─┐
//!                                 ▼
//!               ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! Kotak Neo ◄──►│ QuotePoller │────►│ DeliveryHub │────►│  WebSocket  │──► Client 1
//!  LTP REST     └─────────────┘     │ (broadcast) │     │   Server    │──► Client 2
//!                                   └─────────────┘     └─────────────┘──► Client N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core relay types with no external dependencies.
pub mod domain;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::instrument::{ExchangeSegment, InstrumentKey, SymbolParseError};
pub use domain::quote::NormalizedQuote;
pub use domain::subscription::{BatchOutcome, SubscriptionRegistry, UnsubscribePolicy};

// Infrastructure config
pub use infrastructure::config::{ConfigError, PollTimings, RelayConfig};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Broadcast hub (for integration tests)
pub use infrastructure::broadcast::{DeliveryConfig, DeliveryHub, SharedDeliveryHub};

// Kotak Neo adapters (for integration tests)
pub use infrastructure::kotak::{
    CredentialBootstrap, CredentialClient, CredentialError, CredentialResponse, LtpQuoteMessage,
    PollerSettings, QuotePoller, QuotesClient, SessionCredentials, SessionState, UpstreamError,
};

// WebSocket server (for integration tests)
pub use infrastructure::ws::{ClientRequest, QuoteWsServer, SubscriptionAction, WsServerError};

// Relay runtime state
pub use infrastructure::state::{CycleStatus, RelayState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
