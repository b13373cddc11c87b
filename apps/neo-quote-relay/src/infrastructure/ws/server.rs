//! Quote WebSocket Server
//!
//! Accepts front-end client connections, applies their subscribe and
//! unsubscribe requests to the shared registry, and streams every polled
//! quote to every connected client.
//!
//! # Per-Connection Tasks
//!
//! Each accepted connection runs three pieces:
//!
//! - a writer task that owns the outbound sink and is the only place
//!   frames are sent, so send-error handling lives in one spot
//! - a pump task that drains the quote broadcast into the writer
//! - the read loop, which applies request frames and answers pings
//!
//! A malformed request frame is logged and ignored; it never ends the
//! connection. A fatal send error ends the writer, and the read loop
//! notices the dead socket on its next frame.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{WebSocketStream, accept_async};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::quote::NormalizedQuote;
use crate::domain::subscription::SubscriptionRegistry;
use crate::infrastructure::broadcast::SharedDeliveryHub;
use crate::infrastructure::metrics;
use crate::infrastructure::state::RelayState;

use super::protocol::{ClientRequest, SubscriptionAction};

// =============================================================================
// Constants
// =============================================================================

/// Outbound frames queued per connection before the pump blocks and the
/// broadcast receiver starts lagging instead.
const FRAME_QUEUE_CAPACITY: usize = 64;

/// Pause after a transient send failure before the next frame.
const SEND_RETRY_DELAY: Duration = Duration::from_secs(1);

// =============================================================================
// Error Types
// =============================================================================

/// WebSocket server errors.
#[derive(Debug, Error)]
pub enum WsServerError {
    /// Failed to bind the listen address.
    #[error("failed to bind {0}: {1}")]
    BindFailed(String, String),
}

// =============================================================================
// Server
// =============================================================================

/// WebSocket fan-out server.
pub struct QuoteWsServer {
    bind_addr: String,
    registry: Arc<SubscriptionRegistry>,
    hub: SharedDeliveryHub,
    state: Arc<RelayState>,
}

impl QuoteWsServer {
    /// Create a server for the given listen address.
    #[must_use]
    pub fn new(
        bind_addr: String,
        registry: Arc<SubscriptionRegistry>,
        hub: SharedDeliveryHub,
        state: Arc<RelayState>,
    ) -> Self {
        Self {
            bind_addr,
            registry,
            hub,
            state,
        }
    }

    /// Bind the configured address and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`WsServerError::BindFailed`] if the listen address cannot
    /// be bound.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), WsServerError> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| WsServerError::BindFailed(self.bind_addr.clone(), e.to_string()))?;

        tracing::info!(addr = %self.bind_addr, "websocket server listening");
        self.serve(listener, cancel).await;
        Ok(())
    }

    /// Serve connections from an already-bound listener until cancelled.
    pub async fn serve(self, listener: TcpListener, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("websocket server stopped");
                    return;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let connection = ClientConnection {
                                id: Uuid::new_v4(),
                                peer,
                                registry: Arc::clone(&self.registry),
                                hub: Arc::clone(&self.hub),
                                state: Arc::clone(&self.state),
                            };
                            tokio::spawn(connection.run(stream, cancel.child_token()));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to accept tcp connection");
                        }
                    }
                }
            }
        }
    }
}

// =============================================================================
// Connection Handling
// =============================================================================

struct ClientConnection {
    id: Uuid,
    peer: std::net::SocketAddr,
    registry: Arc<SubscriptionRegistry>,
    hub: SharedDeliveryHub,
    state: Arc<RelayState>,
}

impl ClientConnection {
    async fn run(self, stream: TcpStream, cancel: CancellationToken) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(peer = %self.peer, error = %e, "websocket handshake failed");
                return;
            }
        };

        let total = self.state.client_connected();
        metrics::set_connected_clients(total);
        tracing::info!(connection_id = %self.id, peer = %self.peer, total, "client connected");

        let (sink, mut stream) = ws_stream.split();
        let (frames_tx, frames_rx) = mpsc::channel::<Message>(FRAME_QUEUE_CAPACITY);

        let writer = tokio::spawn(write_frames(self.id, frames_rx, sink));
        let pump = tokio::spawn(pump_quotes(
            self.id,
            self.hub.subscribe_quotes(),
            frames_tx.clone(),
        ));

        self.read_requests(&mut stream, &frames_tx, &cancel).await;

        pump.abort();
        writer.abort();

        let total = self.state.client_disconnected();
        metrics::set_connected_clients(total);
        tracing::info!(connection_id = %self.id, peer = %self.peer, total, "client disconnected");
    }

    async fn read_requests(
        &self,
        stream: &mut SplitStream<WebSocketStream<TcpStream>>,
        frames: &mpsc::Sender<Message>,
        cancel: &CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!(connection_id = %self.id, "closing connection for shutdown");
                    return;
                }
                message = stream.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.handle_request(text.as_str()),
                        Some(Ok(Message::Ping(payload))) => {
                            if frames.send(Message::Pong(payload)).await.is_err() {
                                return;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!(connection_id = %self.id, "client sent close frame");
                            return;
                        }
                        Some(Ok(_)) => {
                            // Ignore binary, pong, and frame fragments
                        }
                        Some(Err(e)) => {
                            tracing::info!(connection_id = %self.id, error = %e, "connection read failed");
                            return;
                        }
                        None => return,
                    }
                }
            }
        }
    }

    /// Apply one request frame to the shared registry.
    ///
    /// Frames that do not parse as a request are dropped without touching
    /// the connection; a buggy front end build must not lose its stream
    /// over one bad message.
    fn handle_request(&self, text: &str) {
        let request: ClientRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    connection_id = %self.id,
                    error = %e,
                    "ignoring malformed request frame"
                );
                return;
            }
        };

        let outcome = match request.action {
            SubscriptionAction::Subscribe => self.registry.subscribe(&request.symbols),
            SubscriptionAction::Unsubscribe => self.registry.unsubscribe(&request.symbols),
        };

        if !outcome.rejected.is_empty() {
            metrics::record_symbol_parse_failures(outcome.rejected.len());
            for reason in &outcome.rejected {
                tracing::warn!(connection_id = %self.id, error = %reason, "symbol skipped");
            }
        }

        metrics::set_subscriptions(self.registry.len());
        tracing::info!(
            connection_id = %self.id,
            action = request.action.as_str(),
            changed = outcome.changed.len(),
            tracking = self.registry.len(),
            "subscription request applied"
        );
    }
}

// =============================================================================
// Outbound Tasks
// =============================================================================

/// Drain the quote broadcast into the connection's frame queue.
async fn pump_quotes(
    connection_id: Uuid,
    mut quotes: broadcast::Receiver<NormalizedQuote>,
    frames: mpsc::Sender<Message>,
) {
    loop {
        match quotes.recv().await {
            Ok(quote) => {
                let json = match serde_json::to_string(&quote) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(connection_id = %connection_id, error = %e, "failed to encode quote");
                        continue;
                    }
                };
                if frames.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(connection_id = %connection_id, skipped, "client lagging, quotes skipped");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Send queued frames, classifying failures as fatal or transient.
async fn write_frames(
    connection_id: Uuid,
    mut frames: mpsc::Receiver<Message>,
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = sink.send(frame).await {
            if is_fatal_send_error(&e) {
                tracing::info!(connection_id = %connection_id, error = %e, "send failed, stopping writes");
                return;
            }
            // Transient failure: this frame is lost, the connection stays.
            tracing::warn!(connection_id = %connection_id, error = %e, "transient send failure, frame dropped");
            tokio::time::sleep(SEND_RETRY_DELAY).await;
        }
    }
}

/// Whether a send error means the connection is gone.
fn is_fatal_send_error(error: &tungstenite::Error) -> bool {
    matches!(
        error,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
            | tungstenite::Error::Protocol(_)
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_connection_errors_are_fatal() {
        assert!(is_fatal_send_error(&tungstenite::Error::ConnectionClosed));
        assert!(is_fatal_send_error(&tungstenite::Error::AlreadyClosed));
        assert!(is_fatal_send_error(&tungstenite::Error::Io(
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe")
        )));
    }

    #[test]
    fn full_write_buffer_is_transient() {
        let error = tungstenite::Error::WriteBufferFull(Message::Text("quote".into()));
        assert!(!is_fatal_send_error(&error));
    }
}
