//! Relay Configuration Settings
//!
//! Configuration types for the quote relay, loaded from environment
//! variables. Every variable has a default; a variable that is set but
//! does not parse is a startup error rather than a silent fallback.

use std::time::Duration;

use crate::domain::subscription::UnsubscribePolicy;

const DEFAULT_WS_BIND: &str = "0.0.0.0:8765";
const DEFAULT_HEALTH_BIND: &str = "0.0.0.0:8083";
const DEFAULT_CREDENTIAL_URL: &str = "http://127.0.0.1:5000/credentials";
const DEFAULT_BROADCAST_CAPACITY: usize = 1_024;

/// Poll cadence and timeout settings.
#[derive(Debug, Clone)]
pub struct PollTimings {
    /// Delay between credential fetch attempts.
    pub credential_retry: Duration,
    /// Delay after a poll cycle that reached upstream.
    pub poll_interval: Duration,
    /// Delay after a cycle skipped for missing credentials or an empty
    /// subscription set.
    pub idle_interval: Duration,
    /// Delay after an upstream transport or decode failure.
    pub error_backoff: Duration,
    /// Per-request timeout for quote fetches.
    pub upstream_timeout: Duration,
}

impl Default for PollTimings {
    fn default() -> Self {
        Self {
            credential_retry: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            idle_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(2),
            upstream_timeout: Duration::from_secs(5),
        }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket listen address.
    pub ws_bind: String,
    /// Health and metrics listen address.
    pub health_bind: String,
    /// Credential source endpoint.
    pub credential_url: String,
    /// Unsubscribe handling policy.
    pub unsubscribe_policy: UnsubscribePolicy,
    /// Poll cadence and timeout settings.
    pub timings: PollTimings,
    /// Quote broadcast channel capacity.
    pub broadcast_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ws_bind: DEFAULT_WS_BIND.to_string(),
            health_bind: DEFAULT_HEALTH_BIND.to_string(),
            credential_url: DEFAULT_CREDENTIAL_URL.to_string(),
            unsubscribe_policy: UnsubscribePolicy::default(),
            timings: PollTimings::default(),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any set variable is empty, non-numeric where a
    /// number is expected, or names an unknown unsubscribe policy.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let ws_bind = env_string("RELAY_WS_BIND", &defaults.ws_bind)?;
        let health_bind = env_string("HEALTH_BIND", &defaults.health_bind)?;
        let credential_url = env_string("RELAY_CREDENTIAL_URL", &defaults.credential_url)?;

        let unsubscribe_policy = match std::env::var("RELAY_UNSUBSCRIBE_POLICY") {
            Err(_) => defaults.unsubscribe_policy,
            Ok(raw) => UnsubscribePolicy::from_str_case_insensitive(&raw).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: "RELAY_UNSUBSCRIBE_POLICY".to_string(),
                    value: raw.clone(),
                    reason: "expected \"remove\" or \"ignore\"".to_string(),
                }
            })?,
        };

        let timings = PollTimings {
            credential_retry: parse_env_duration_secs(
                "RELAY_CREDENTIAL_RETRY_SECS",
                defaults.timings.credential_retry,
            )?,
            poll_interval: parse_env_duration_secs(
                "RELAY_POLL_INTERVAL_SECS",
                defaults.timings.poll_interval,
            )?,
            idle_interval: parse_env_duration_secs(
                "RELAY_IDLE_INTERVAL_SECS",
                defaults.timings.idle_interval,
            )?,
            error_backoff: parse_env_duration_secs(
                "RELAY_ERROR_BACKOFF_SECS",
                defaults.timings.error_backoff,
            )?,
            upstream_timeout: parse_env_duration_secs(
                "RELAY_UPSTREAM_TIMEOUT_SECS",
                defaults.timings.upstream_timeout,
            )?,
        };

        let broadcast_capacity =
            parse_env_usize("RELAY_BROADCAST_CAPACITY", defaults.broadcast_capacity)?;

        Ok(Self {
            ws_bind,
            health_bind,
            credential_url,
            unsubscribe_policy,
            timings,
            broadcast_capacity,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable is set to a value outside the accepted set.
    #[error("environment variable {key} has invalid value {value:?}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// The offending value as found in the environment.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

fn env_string(key: &str, default: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default.to_string()),
        Ok(value) if value.is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
        Ok(value) => Ok(value),
    }
}

fn parse_env_usize(key: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.parse() {
            Ok(value) => Ok(value),
            Err(e) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
                reason: format!("{e}"),
            }),
        },
    }
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.parse::<u64>() {
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(e) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
                reason: format!("{e}"),
            }),
        },
    }
}
