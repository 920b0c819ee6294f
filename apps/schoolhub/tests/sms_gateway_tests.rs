//! Integration tests for the Fast2SMS gateway client.
//!
//! Uses wiremock to stand in for the gateway.

#![allow(clippy::unwrap_used, clippy::panic)]

use schoolhub::sms::SmsGateway;
use schoolhub_core::sms::DEMO_RESPONSE;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> SmsGateway {
    SmsGateway::new(Some("test-key".into()), server.uri())
}

// =============================================================================
// SEND
// =============================================================================

#[tokio::test]
async fn test_send_uses_bulk_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/bulkV2"))
        .and(query_param("authorization", "test-key"))
        .and(query_param("route", "q"))
        .and(query_param("language", "english"))
        .and(query_param("flash", "0"))
        .and(query_param("numbers", "9876543210,9123456789"))
        .and(query_param("message", "Hello parents"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "return": true,
            "request_id": "abc123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = gateway(&server)
        .send(&["9876543210", "9123456789"], "Hello parents")
        .await;
    assert!(outcome.success);
    assert!(!outcome.demo_mode);
    assert!(outcome.api_response.contains("abc123"));
}

#[tokio::test]
async fn test_send_fails_when_gateway_returns_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/bulkV2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "return": false,
            "message": "Invalid numbers"
        })))
        .mount(&server)
        .await;

    let outcome = gateway(&server).send(&["9876543210"], "Hi").await;
    assert!(!outcome.success);
    assert!(outcome.api_response.contains("Invalid numbers"));
}

#[tokio::test]
async fn test_send_fails_on_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/bulkV2"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "return": true
        })))
        .mount(&server)
        .await;

    let outcome = gateway(&server).send(&["9876543210"], "Hi").await;
    assert!(!outcome.success);
}

#[tokio::test]
async fn test_send_reports_unreachable_gateway() {
    let gateway = SmsGateway::new(Some("k".into()), "http://127.0.0.1:1");
    let outcome = gateway.send(&["9876543210"], "Hi").await;
    assert!(!outcome.success);
    assert!(outcome.api_response.starts_with("Error: "));
}

#[tokio::test]
async fn test_demo_mode_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = SmsGateway::new(None, server.uri());
    let outcome = gateway.send(&["9876543210"], "Hi").await;
    assert!(outcome.success);
    assert!(outcome.demo_mode);
    assert_eq!(outcome.api_response, DEMO_RESPONSE);
}

// =============================================================================
// BALANCE
// =============================================================================

#[tokio::test]
async fn test_balance_wraps_wallet_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/wallet"))
        .and(query_param("authorization", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"wallet":"42.50"}"#))
        .mount(&server)
        .await;

    let balance = gateway(&server).balance().await;
    assert_eq!(balance["success"], true);
    assert_eq!(balance["data"], r#"{"wallet":"42.50"}"#);
}

#[tokio::test]
async fn test_balance_without_key() {
    let balance = SmsGateway::new(None, "http://127.0.0.1:1").balance().await;
    assert_eq!(balance["success"], false);
    assert_eq!(balance["error"], "API key not configured");
}

#[tokio::test]
async fn test_balance_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/wallet"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let balance = gateway(&server).balance().await;
    assert_eq!(balance["success"], false);
    assert!(balance["error"].is_string());
}
