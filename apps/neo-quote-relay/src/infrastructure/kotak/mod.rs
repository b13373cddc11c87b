//! Kotak Neo Upstream Adapters
//!
//! Implements the HTTP clients for the Kotak Neo side of the relay:
//!
//! - **Credentials**: bootstrap polling against the local credential source
//! - **Quotes**: cyclic LTP polling against the trading API

pub mod credentials;
pub mod messages;
pub mod quotes;

pub use credentials::{
    CredentialBootstrap, CredentialClient, CredentialError, SessionCredentials, SessionState,
};
pub use messages::{CredentialResponse, LtpQuoteMessage};
pub use quotes::{PollerSettings, QuotePoller, QuotesClient, UpstreamError};
