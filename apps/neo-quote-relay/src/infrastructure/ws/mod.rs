//! WebSocket Serving Surface
//!
//! The client-facing side of the relay:
//!
//! - **protocol**: inbound request frame types
//! - **server**: accept loop and per-connection fan-out

pub mod protocol;
pub mod server;

pub use protocol::{ClientRequest, SubscriptionAction};
pub use server::{QuoteWsServer, WsServerError};
