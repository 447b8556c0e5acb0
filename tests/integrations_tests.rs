//! Unit tests for the HTTP collaborator clients
//!
//! Tests the listing service, notification webhook and reputation ledger
//! clients against mock HTTP servers.

use serde_json::json;
use swap_negotiation::integrations::{
    HttpListingRepository, HttpReputationLedger, InMemoryReputationLedger, ListingRepository,
    NotificationSink, ReputationLedger, SwapEvent, WebhookNotificationSink,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{target_listing, DUMMY_TARGET_LISTING_ID, DUMMY_TARGET_USER_ID};

const TIMEOUT_MS: u64 = 2000;

// ============================================================================
// LISTING SERVICE TESTS
// ============================================================================

/// Test that a listing is fetched and decoded
/// What is tested: HttpListingRepository::get_listing on a 200 response
/// Why: Eligibility and validation depend on the listing's fields
#[tokio::test]
async fn test_get_listing_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/listings/{}", DUMMY_TARGET_LISTING_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(target_listing()))
        .expect(1)
        .mount(&server)
        .await;

    let repo = HttpListingRepository::new(&server.uri(), TIMEOUT_MS).unwrap();
    let listing = repo.get_listing(DUMMY_TARGET_LISTING_ID).await.unwrap();

    assert_eq!(listing, Some(target_listing()));
}

/// Test that a 404 means the listing does not exist
/// What is tested: HttpListingRepository::get_listing on a 404 response
/// Why: Unknown listings are a validation problem, not an outage
#[tokio::test]
async fn test_get_listing_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listings/listing-gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let repo = HttpListingRepository::new(&format!("{}/", server.uri()), TIMEOUT_MS).unwrap();

    assert_eq!(repo.get_listing("listing-gone").await.unwrap(), None);
}

/// Test that server errors are surfaced
/// What is tested: HttpListingRepository::get_listing on a 500 response
/// Why: The engine reports these as a listing lookup failure
#[tokio::test]
async fn test_get_listing_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let repo = HttpListingRepository::new(&server.uri(), TIMEOUT_MS).unwrap();

    assert!(repo.get_listing(DUMMY_TARGET_LISTING_ID).await.is_err());
}

/// Test the reservation request
/// What is tested: HttpListingRepository::set_reserved sends PUT with the flag
#[tokio::test]
async fn test_set_reserved() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/listings/{}/reservation", DUMMY_TARGET_LISTING_ID)))
        .and(body_json(json!({ "reserved": true })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let repo = HttpListingRepository::new(&server.uri(), TIMEOUT_MS).unwrap();

    repo.set_reserved(DUMMY_TARGET_LISTING_ID, true).await.unwrap();
}

/// Test that a listing id with path characters stays one path segment
/// What is tested: get_listing and set_reserved percent-encode `/`, `..` and `?` in the id
/// Why: Listing ids come from user drafts and must not reach other listing service paths
#[tokio::test]
async fn test_listing_id_is_single_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/listings/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(target_listing()))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let repo = HttpListingRepository::new(&server.uri(), TIMEOUT_MS).unwrap();

    assert_eq!(repo.get_listing("../admin/listings/secret").await.unwrap(), None);
    assert_eq!(repo.get_listing("camera?owner=admin").await.unwrap(), None);
    repo.set_reserved("../admin", true).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<(String, Option<String>)> = requests
        .iter()
        .map(|request| (request.url.path().to_string(), request.url.query().map(String::from)))
        .collect();
    assert_eq!(
        paths,
        vec![
            ("/listings/..%2Fadmin%2Flistings%2Fsecret".to_string(), None),
            ("/listings/camera%3Fowner=admin".to_string(), None),
            ("/listings/..%2Fadmin/reservation".to_string(), None),
        ]
    );
}

/// Test that ids which cannot form a path segment are refused without a request
/// What is tested: get_listing with empty and dot-segment ids
#[tokio::test]
async fn test_listing_id_dot_segments_refused() {
    let server = MockServer::start().await;
    let repo = HttpListingRepository::new(&server.uri(), TIMEOUT_MS).unwrap();

    assert!(repo.get_listing("..").await.is_err());
    assert!(repo.get_listing(".").await.is_err());
    assert!(repo.set_reserved("", true).await.is_err());
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// NOTIFICATION WEBHOOK TESTS
// ============================================================================

/// Test that notifications are posted with user, event and payload
/// What is tested: WebhookNotificationSink::notify request body
/// Why: Downstream delivery routes on the event name
#[tokio::test]
async fn test_webhook_notify() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/swaps"))
        .and(body_json(json!({
            "user_id": DUMMY_TARGET_USER_ID,
            "event": "swap_proposed",
            "payload": { "swap_id": "swap-1" }
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let webhook_url = format!("{}/hooks/swaps", server.uri());
    let sink = WebhookNotificationSink::new(&webhook_url, TIMEOUT_MS).unwrap();

    sink.notify(DUMMY_TARGET_USER_ID, SwapEvent::Proposed, json!({ "swap_id": "swap-1" }))
        .await
        .unwrap();
}

/// Test that a failing webhook is reported to the caller
/// What is tested: WebhookNotificationSink::notify on a 503 response
#[tokio::test]
async fn test_webhook_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sink = WebhookNotificationSink::new(&server.uri(), TIMEOUT_MS).unwrap();

    assert!(sink
        .notify(DUMMY_TARGET_USER_ID, SwapEvent::Accepted, json!({}))
        .await
        .is_err());
}

// ============================================================================
// REPUTATION LEDGER TESTS
// ============================================================================

/// Test the credit request
/// What is tested: HttpReputationLedger::credit request body
#[tokio::test]
async fn test_ledger_credit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/credits"))
        .and(body_json(json!({
            "user_id": DUMMY_TARGET_USER_ID,
            "amount": 10,
            "reason": "completed swap swap-1"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let ledger = HttpReputationLedger::new(&server.uri(), TIMEOUT_MS).unwrap();

    ledger
        .credit(DUMMY_TARGET_USER_ID, 10, "completed swap swap-1")
        .await
        .unwrap();
}

/// Test that the in-memory ledger accumulates credits
/// What is tested: InMemoryReputationLedger::credit and balance
#[tokio::test]
async fn test_in_memory_ledger_balance() {
    let ledger = InMemoryReputationLedger::new();
    ledger.credit(DUMMY_TARGET_USER_ID, 10, "first").await.unwrap();
    ledger.credit(DUMMY_TARGET_USER_ID, 5, "second").await.unwrap();

    assert_eq!(ledger.balance(DUMMY_TARGET_USER_ID).await, 15);
    assert_eq!(ledger.balance("nobody").await, 0);
}
