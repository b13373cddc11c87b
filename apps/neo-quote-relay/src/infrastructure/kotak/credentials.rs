//! Kotak Neo Credential Bootstrap
//!
//! Polls the local credential source until a completed login appears, then
//! publishes the session for the quote poller to read.
//!
//! # Bootstrap Flow
//!
//! 1. GET the credential endpoint
//! 2. The response carries `usersession` and `baseUrl` once the external
//!    login has completed; before that the fields are empty or missing
//! 3. Both present: publish [`SessionCredentials`] and stop polling
//! 4. Otherwise: sleep the retry delay and try again
//!
//! The loop never gives up. Until the upstream session exists the relay
//! keeps accepting client connections and simply has nothing to send.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::messages::CredentialResponse;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while fetching credentials.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// HTTP client construction failed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// Request could not be sent or the response never arrived.
    #[error("credential request failed: {0}")]
    Transport(String),

    /// Credential source answered with a non-OK status.
    #[error("credential source returned status {status}")]
    Status {
        /// HTTP status code returned by the credential source.
        status: u16,
    },

    /// Response body did not decode as a credential payload.
    #[error("credential response could not be decoded: {0}")]
    Decode(String),
}

// =============================================================================
// Session Credentials
// =============================================================================

/// A completed upstream session: auth token plus the API base URL bound to it.
///
/// The `Debug` implementation redacts the token and session id for safe
/// logging.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    token: String,
    session_id: String,
    user_id: String,
    base_url: String,
}

impl SessionCredentials {
    /// Promote a credential response to usable credentials.
    ///
    /// Returns `None` unless both the session token and the base URL are
    /// present and non-empty; a partially filled response means the login
    /// has not completed yet.
    #[must_use]
    pub fn from_response(response: CredentialResponse) -> Option<Self> {
        let token = response.usersession.unwrap_or_default();
        let base_url = response.base_url.unwrap_or_default();
        if token.is_empty() || base_url.is_empty() {
            return None;
        }
        Some(Self {
            token,
            session_id: response.sid.unwrap_or_default(),
            user_id: response.userid.unwrap_or_default(),
            base_url,
        })
    }

    /// Session token, sent verbatim as the `Authorization` header value.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Server-assigned session id.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Trading account user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Base URL of the quotes API for this session.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("token", &"[REDACTED]")
            .field("session_id", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Shared slot holding the published credentials.
///
/// The bootstrap task writes it once; the poller reads it every cycle.
#[derive(Debug, Default)]
pub struct SessionState {
    credentials: RwLock<Option<SessionCredentials>>,
}

impl SessionState {
    /// Create an empty session slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish credentials for the rest of the process to read.
    ///
    /// The first publish wins; later calls leave the stored value alone
    /// and return `false`.
    pub fn publish(&self, credentials: SessionCredentials) -> bool {
        let mut guard = self.credentials.write();
        if guard.is_some() {
            return false;
        }
        *guard = Some(credentials);
        true
    }

    /// Snapshot of the published credentials, if any.
    #[must_use]
    pub fn get(&self) -> Option<SessionCredentials> {
        self.credentials.read().clone()
    }

    /// Whether credentials have been published.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.credentials.read().is_some()
    }
}

// =============================================================================
// Credential Client
// =============================================================================

/// HTTP client for the credential source.
///
/// Deliberately has no request timeout: the source is a local process that
/// answers quickly or not at all, and the bootstrap loop already bounds
/// each attempt with its retry cadence.
#[derive(Debug, Clone)]
pub struct CredentialClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CredentialClient {
    /// Create a client polling the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::ClientBuild`] if the underlying HTTP
    /// client cannot be constructed.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, CredentialError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CredentialError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Fetch the current credential payload.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Transport`] if the request fails,
    /// [`CredentialError::Status`] on any non-200 response, or
    /// [`CredentialError::Decode`] if the body is not a credential payload.
    pub async fn fetch(&self) -> Result<CredentialResponse, CredentialError> {
        let response = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| CredentialError::Transport(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(CredentialError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<CredentialResponse>()
            .await
            .map_err(|e| CredentialError::Decode(e.to_string()))
    }
}

// =============================================================================
// Credential Bootstrap
// =============================================================================

/// Task that polls the credential source until a session appears.
#[derive(Debug)]
pub struct CredentialBootstrap {
    client: CredentialClient,
    session: Arc<SessionState>,
    retry_delay: Duration,
}

impl CredentialBootstrap {
    /// Create a bootstrap task publishing into the given session slot.
    #[must_use]
    pub fn new(
        client: CredentialClient,
        session: Arc<SessionState>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            session,
            retry_delay,
        }
    }

    /// Poll until the credential source yields a completed session.
    ///
    /// Fetch failures and incomplete payloads are logged and retried after
    /// the configured delay; this future only resolves with credentials in
    /// hand.
    pub async fn await_credentials(&self) -> SessionCredentials {
        loop {
            match self.client.fetch().await {
                Ok(response) => {
                    if let Some(credentials) = SessionCredentials::from_response(response) {
                        return credentials;
                    }
                    tracing::info!(
                        retry_secs = self.retry_delay.as_secs(),
                        "credential source reachable but login not complete, retrying"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_secs = self.retry_delay.as_secs(),
                        "credential fetch failed, retrying"
                    );
                }
            }

            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// Run the bootstrap to completion or cancellation.
    ///
    /// On success the credentials are published exactly once and the task
    /// exits; the poller picks them up on its next cycle.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(endpoint = %self.client.endpoint, "credential bootstrap started");

        tokio::select! {
            credentials = self.await_credentials() => {
                tracing::info!(
                    user_id = %credentials.user_id(),
                    base_url = %credentials.base_url(),
                    "session credentials acquired"
                );
                self.session.publish(credentials);
            }
            () = cancel.cancelled() => {
                tracing::info!("credential bootstrap cancelled before a session appeared");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_response() -> CredentialResponse {
        CredentialResponse {
            usersession: Some("tok-123".to_string()),
            sid: Some("sid-456".to_string()),
            userid: Some("AB1234".to_string()),
            base_url: Some("https://gw.example.com".to_string()),
        }
    }

    #[test]
    fn from_response_requires_token_and_base_url() {
        assert!(SessionCredentials::from_response(full_response()).is_some());

        let mut missing_token = full_response();
        missing_token.usersession = None;
        assert!(SessionCredentials::from_response(missing_token).is_none());

        let mut empty_token = full_response();
        empty_token.usersession = Some(String::new());
        assert!(SessionCredentials::from_response(empty_token).is_none());

        let mut missing_base = full_response();
        missing_base.base_url = None;
        assert!(SessionCredentials::from_response(missing_base).is_none());

        let mut empty_base = full_response();
        empty_base.base_url = Some(String::new());
        assert!(SessionCredentials::from_response(empty_base).is_none());
    }

    #[test]
    fn from_response_tolerates_missing_optional_fields() {
        let response = CredentialResponse {
            usersession: Some("tok".to_string()),
            sid: None,
            userid: None,
            base_url: Some("https://gw.example.com".to_string()),
        };
        let credentials = SessionCredentials::from_response(response).unwrap();
        assert_eq!(credentials.session_id(), "");
        assert_eq!(credentials.user_id(), "");
    }

    #[test]
    fn debug_redacts_token_and_session_id() {
        let credentials = SessionCredentials::from_response(full_response()).unwrap();
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("tok-123"));
        assert!(!debug.contains("sid-456"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("AB1234"));
        assert!(debug.contains("https://gw.example.com"));
    }

    #[test]
    fn session_state_starts_empty() {
        let state = SessionState::new();
        assert!(!state.is_ready());
        assert!(state.get().is_none());
    }

    #[test]
    fn session_state_first_publish_wins() {
        let state = SessionState::new();

        let first = SessionCredentials::from_response(full_response()).unwrap();
        assert!(state.publish(first.clone()));

        let mut other = full_response();
        other.usersession = Some("tok-999".to_string());
        let second = SessionCredentials::from_response(other).unwrap();
        assert!(!state.publish(second));

        let stored = state.get().unwrap();
        assert_eq!(stored.token(), first.token());
    }
}
