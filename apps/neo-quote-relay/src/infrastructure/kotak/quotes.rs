//! Kotak Neo LTP Quote Polling
//!
//! Pull adapter for the Kotak Neo quotes REST API. One request per cycle
//! covers the whole subscription set:
//!
//! `GET {baseUrl}/script-details/1.0/quotes/neosymbol/{query}/ltp`
//!
//! where `{query}` is a comma-joined list of `segment|token` fragments.
//!
//! # Poll Cadence
//!
//! | Cycle outcome                        | Next poll after |
//! |--------------------------------------|-----------------|
//! | Quotes fetched                       | poll interval   |
//! | No credentials / nothing subscribed  | idle interval   |
//! | Upstream returned non-200            | poll interval   |
//! | Transport or decode failure          | error backoff   |
//!
//! A non-200 status drops that batch and keeps the normal cadence; the
//! gateway answers this way routinely around session expiry and market
//! close, so it is not worth a warning per cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::instrument::InstrumentKey;
use crate::domain::subscription::SubscriptionRegistry;
use crate::infrastructure::broadcast::SharedDeliveryHub;
use crate::infrastructure::metrics::{self, PollOutcome};
use crate::infrastructure::state::RelayState;

use super::credentials::{SessionCredentials, SessionState};
use super::messages::LtpQuoteMessage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while fetching quotes.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// HTTP client construction failed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// Request could not be sent or timed out.
    #[error("quote request failed: {0}")]
    Transport(String),

    /// Upstream answered with a non-OK status.
    #[error("upstream returned status {status}")]
    Status {
        /// HTTP status code returned by the quotes API.
        status: u16,
    },

    /// Response body did not decode as a quote array.
    #[error("quote response could not be decoded: {0}")]
    Decode(String),
}

// =============================================================================
// Quotes Client
// =============================================================================

/// HTTP client for the LTP quotes endpoint.
#[derive(Debug, Clone)]
pub struct QuotesClient {
    http: reqwest::Client,
}

impl QuotesClient {
    /// Create a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::ClientBuild`] if the underlying HTTP
    /// client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }

    /// Fetch last-traded-price quotes for the given instruments.
    ///
    /// The response array preserves upstream order; callers rely on that
    /// for delivery ordering.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] if the request fails or times
    /// out, [`UpstreamError::Status`] on any non-200 response, or
    /// [`UpstreamError::Decode`] if the body is not a quote array.
    pub async fn fetch_ltp(
        &self,
        credentials: &SessionCredentials,
        instruments: &[InstrumentKey],
    ) -> Result<Vec<LtpQuoteMessage>, UpstreamError> {
        let query = instruments
            .iter()
            .map(InstrumentKey::query_fragment)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}/script-details/1.0/quotes/neosymbol/{query}/ltp",
            credentials.base_url()
        );

        let response = self
            .http
            .get(&url)
            .header("Authorization", credentials.token())
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<LtpQuoteMessage>>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

// =============================================================================
// Poller Configuration
// =============================================================================

/// Timing knobs for the quote poller.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Delay after a cycle that reached upstream.
    pub poll_interval: Duration,
    /// Delay after a cycle skipped for missing credentials or an empty
    /// subscription set.
    pub idle_interval: Duration,
    /// Delay after a transport or decode failure.
    pub error_backoff: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            idle_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(2),
        }
    }
}

// =============================================================================
// Quote Poller
// =============================================================================

/// Task that polls upstream once per cycle and fans quotes out to clients.
///
/// The poller never terminates on its own: upstream failures adjust the
/// cadence for the next cycle and nothing else.
pub struct QuotePoller {
    client: QuotesClient,
    session: Arc<SessionState>,
    registry: Arc<SubscriptionRegistry>,
    hub: SharedDeliveryHub,
    state: Arc<RelayState>,
    settings: PollerSettings,
}

impl QuotePoller {
    /// Wire a poller to its collaborators.
    #[must_use]
    pub fn new(
        client: QuotesClient,
        session: Arc<SessionState>,
        registry: Arc<SubscriptionRegistry>,
        hub: SharedDeliveryHub,
        state: Arc<RelayState>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            client,
            session,
            registry,
            hub,
            state,
            settings,
        }
    }

    /// Execute one poll cycle and return the delay before the next.
    pub async fn poll_once(&self) -> Duration {
        let Some(credentials) = self.session.get() else {
            metrics::record_poll_cycle(PollOutcome::Skipped);
            self.state.record_cycle_idle();
            return self.settings.idle_interval;
        };

        let instruments = self.registry.snapshot();
        if instruments.is_empty() {
            metrics::record_poll_cycle(PollOutcome::Skipped);
            self.state.record_cycle_idle();
            return self.settings.idle_interval;
        }

        let started = Instant::now();
        match self.client.fetch_ltp(&credentials, &instruments).await {
            Ok(batch) => {
                metrics::record_upstream_request_duration(started.elapsed());
                metrics::record_poll_cycle(PollOutcome::Ok);

                let mut delivered: u64 = 0;
                for message in batch {
                    if self.hub.deliver(message.into_quote()).is_some() {
                        delivered += 1;
                    }
                }
                metrics::record_quotes_delivered(delivered);
                self.state.record_cycle_ok(delivered);
                self.settings.poll_interval
            }
            Err(e @ UpstreamError::Status { .. }) => {
                metrics::record_poll_cycle(PollOutcome::Error);
                self.state.record_cycle_error(e.to_string());
                tracing::debug!(error = %e, "upstream rejected quote request, batch dropped");
                self.settings.poll_interval
            }
            Err(e) => {
                metrics::record_poll_cycle(PollOutcome::Error);
                self.state.record_cycle_error(e.to_string());
                tracing::warn!(
                    error = %e,
                    backoff_secs = self.settings.error_backoff.as_secs(),
                    "quote poll failed, backing off"
                );
                self.settings.error_backoff
            }
        }
    }

    /// Run poll cycles until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            poll_secs = self.settings.poll_interval.as_secs(),
            idle_secs = self.settings.idle_interval.as_secs(),
            "quote poller started"
        );

        loop {
            let delay = self.poll_once().await;

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("quote poller stopped");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
