//! Credential Bootstrap Integration Tests
//!
//! Drives the bootstrap loop against a mock credential source and checks
//! that a session is published exactly once, only when login is complete.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use neo_quote_relay::{CredentialBootstrap, CredentialClient, SessionState};

/// Retry delay short enough to drive several attempts inside one test.
const RETRY_DELAY: Duration = Duration::from_millis(50);

fn bootstrap_for(server: &MockServer, session: &Arc<SessionState>) -> CredentialBootstrap {
    let client = CredentialClient::new(format!("{}/credentials", server.uri())).unwrap();
    CredentialBootstrap::new(client, Arc::clone(session), RETRY_DELAY)
}

// =============================================================================
// Retry Behaviour
// =============================================================================

#[tokio::test]
async fn test_await_credentials_retries_until_login_completes() {
    let server = MockServer::start().await;

    // The source serves the same endpoint before and after the external
    // login: first an empty body, then a token without a base URL, then
    // the full session. Only the last one counts as complete.
    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usersession": "tok-123"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usersession": "tok-123",
            "sid": "sid-1",
            "userid": "trader-7",
            "baseUrl": "https://quotes.example"
        })))
        .mount(&server)
        .await;

    let session = Arc::new(SessionState::new());
    let bootstrap = bootstrap_for(&server, &session);

    let credentials = timeout(Duration::from_secs(2), bootstrap.await_credentials())
        .await
        .expect("bootstrap should resolve once the login completes");

    assert_eq!(credentials.token(), "tok-123");
    assert_eq!(credentials.session_id(), "sid-1");
    assert_eq!(credentials.user_id(), "trader-7");
    assert_eq!(credentials.base_url(), "https://quotes.example");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_await_credentials_survives_source_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usersession": "tok-9",
            "baseUrl": "https://quotes.example"
        })))
        .mount(&server)
        .await;

    let session = Arc::new(SessionState::new());
    let bootstrap = bootstrap_for(&server, &session);

    let credentials = timeout(Duration::from_secs(2), bootstrap.await_credentials())
        .await
        .expect("bootstrap should outlive transient source failures");

    assert_eq!(credentials.token(), "tok-9");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

// =============================================================================
// Session Publication
// =============================================================================

#[tokio::test]
async fn test_run_publishes_the_session_for_other_tasks() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usersession": "tok-123",
            "sid": "sid-1",
            "userid": "trader-7",
            "baseUrl": "https://quotes.example"
        })))
        .mount(&server)
        .await;

    let session = Arc::new(SessionState::new());
    let bootstrap = bootstrap_for(&server, &session);

    // run() returns after the one-and-only publish.
    timeout(
        Duration::from_secs(2),
        tokio::spawn(bootstrap.run(CancellationToken::new())),
    )
    .await
    .expect("run should return after publishing")
    .unwrap();

    assert!(session.is_ready());
    let stored = session.get().unwrap();
    assert_eq!(stored.token(), "tok-123");
    assert_eq!(stored.base_url(), "https://quotes.example");
}

#[tokio::test]
async fn test_run_stops_cleanly_when_cancelled_before_login() {
    let server = MockServer::start().await;

    // Login never completes; the endpoint keeps serving an empty body.
    Mock::given(method("GET"))
        .and(path("/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let session = Arc::new(SessionState::new());
    let bootstrap = bootstrap_for(&server, &session);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(bootstrap.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();

    timeout(Duration::from_secs(1), handle)
        .await
        .expect("run should return promptly after cancellation")
        .unwrap();

    assert!(!session.is_ready());
}
