//! Domain Layer - Core relay types and business logic.
//!
//! This layer contains the core domain types for quote relaying
//! with no external dependencies. All types here are pure Rust with
//! serialization support.

/// Instrument identity and raw-symbol parsing.
pub mod instrument;

/// Normalized quote type delivered to clients.
pub mod quote;

/// Subscription registry shared by all connections.
pub mod subscription;
