//! Integration tests for the HTTP transport driven by the call coordinator
//!
//! **Purpose**: Test the full path from call spec → coordinator → reqwest
//! transport → live HTTP server and back.
//!
//! **Coverage:**
//! - Coordinator retries against a flaky upstream until it recovers
//! - Server-supplied `Retry-After` pacing between attempts
//! - Response cache and single-flight dedup over a real transport
//! - Bearer credentials attached from a token source
//!
//! **Infrastructure:**
//! - WireMock HTTP server (simulates the remote service)
//! - Real reqwest client with short retry delays

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use breakwater_core::CallCoordinator;
use breakwater_domain::{CallPolicy, CallSpec, ClientConfig, FaultClass};
use breakwater_infra::{HttpTransport, StaticTokenSource};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Policy with production shape but millisecond delays, so retry tests
/// finish quickly against a real server.
fn quick_policy() -> CallPolicy {
    CallPolicy {
        default_ttl: Duration::from_secs(300),
        retry_base: Duration::from_millis(25),
        retry_cap: Duration::from_millis(100),
        default_retries: 3,
    }
}

fn coordinator_for(server: &MockServer) -> CallCoordinator {
    let transport = HttpTransport::builder(server.uri()).build().expect("transport should build");
    CallCoordinator::builder(Arc::new(transport)).policy(quick_policy()).build()
}

// ============================================================================
// Retry Behaviour
// ============================================================================

#[tokio::test]
async fn test_flaky_upstream_recovers_within_the_budget() {
    init_tracing();
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_responder = Arc::clone(&hits);
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(move |_: &wiremock::Request| -> ResponseTemplate {
            if hits_in_responder.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"recovered": true}))
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server);
    let outcome = coordinator
        .execute(&CallSpec::read("/status"), CancellationToken::new())
        .await
        .expect("third attempt should succeed");

    assert_eq!(outcome.value, json!({"recovered": true}));
    assert_eq!(outcome.status, Some(200));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_budget_surfaces_the_server_fault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(502))
        .expect(4)
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server);
    let outcome = coordinator.execute(&CallSpec::read("/broken"), CancellationToken::new()).await;

    match outcome {
        Err(error) => {
            assert_eq!(error.class(), FaultClass::Server);
            assert_eq!(error.status(), Some(502));
        }
        Ok(_) => panic!("a permanently broken upstream cannot succeed"),
    }

    let requests = server.received_requests().await.expect("requests recorded");
    assert_eq!(requests.len(), 4, "budget of 3 retries means 4 attempts");
}

#[tokio::test]
async fn test_retry_after_header_paces_the_second_attempt() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_responder = Arc::clone(&hits);
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(move |_: &wiremock::Request| -> ResponseTemplate {
            if hits_in_responder.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(429).insert_header("Retry-After", "1")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"ok": true}))
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server);
    let started = Instant::now();
    let outcome = coordinator
        .execute(&CallSpec::read("/limited"), CancellationToken::new())
        .await
        .expect("second attempt should succeed");
    let waited = started.elapsed();

    assert_eq!(outcome.value, json!({"ok": true}));
    assert!(waited >= Duration::from_secs(1), "server delay must be honoured, waited {waited:?}");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Cache & Dedup
// ============================================================================

#[tokio::test]
async fn test_repeat_reads_are_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "riley"})))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server);
    let spec = CallSpec::read("/profile");

    let first = coordinator
        .execute(&spec, CancellationToken::new())
        .await
        .expect("network read should succeed");
    let second = coordinator
        .execute(&spec, CancellationToken::new())
        .await
        .expect("cached read should succeed");

    assert_eq!(first.value, second.value);
    assert_eq!(second.status, None, "cache hits carry no status");

    let requests = server.received_requests().await.expect("requests recorded");
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_concurrent_reads_share_one_network_call() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow-report"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"rows": 128}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = coordinator_for(&server);
    let spec = CallSpec::read("/slow-report");

    let (first, second) = tokio::join!(
        coordinator.execute(&spec, CancellationToken::new()),
        coordinator.execute(&spec, CancellationToken::new()),
    );

    assert_eq!(
        first.expect("first caller should succeed").value,
        second.expect("second caller should succeed").value,
    );

    let requests = server.received_requests().await.expect("requests recorded");
    assert_eq!(requests.len(), 1, "the joiner must ride the owner's request");
}

// ============================================================================
// Credentials & Configuration
// ============================================================================

#[tokio::test]
async fn test_bearer_token_reaches_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submissions"))
        .and(header("Authorization", "Bearer integration-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::builder(server.uri()).build().expect("transport should build");
    let coordinator = CallCoordinator::builder(Arc::new(transport))
        .token_source(Arc::new(StaticTokenSource::new("integration-token")))
        .policy(quick_policy())
        .build();

    let outcome = coordinator
        .execute(&CallSpec::create("/submissions"), CancellationToken::new())
        .await
        .expect("authenticated write should succeed");

    assert_eq!(outcome.status, Some(201));
}

#[tokio::test]
async fn test_transport_built_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"up": true})))
        .mount(&server)
        .await;

    let config = ClientConfig { base_url: server.uri(), ..Default::default() };
    let transport = HttpTransport::from_config(&config).expect("config should build a transport");
    let coordinator = CallCoordinator::new(Arc::new(transport));

    let outcome = coordinator
        .execute(&CallSpec::read("/health"), CancellationToken::new())
        .await
        .expect("configured transport should reach the server");

    assert_eq!(outcome.value, json!({"up": true}));
}
