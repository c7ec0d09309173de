//! Integration tests for the HTTP order service client.
//!
//! A local mock service stands in for the order API so the register can be
//! driven end to end over real HTTP.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use till_core::{Customer, OrderType};
use till_integration_tests::{gst, product};
use till_pos::billing::BillOptions;
use till_pos::config::FeatureGrant;
use till_pos::remote::HttpRemote;
use till_pos::store::MemoryStore;
use till_pos::sync::PassOutcome;
use till_pos::{Register, TillError};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn register_at(base_url: &str) -> Register {
    let remote = HttpRemote::new(Url::parse(base_url).unwrap(), Duration::from_secs(2)).unwrap();
    Register::with_parts(
        Arc::new(MemoryStore::new()),
        Arc::new(remote),
        FeatureGrant::basic(),
        gst(),
    )
    .await
}

async fn answer_orders(server: &MockServer, status: u16) {
    server.reset().await;
    let response = if status < 300 {
        ResponseTemplate::new(status)
            .set_body_json(json!({ "message": "Order saved successfully" }))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(response)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

async fn order_posts(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/orders")
        .count()
}

async fn checkout_coke(till: &Register) -> Result<till_pos::Checkout, TillError> {
    till.add_to_cart(&product(2).unwrap()).await.unwrap();
    till.checkout(OrderType::Delivery, Customer::default(), &BillOptions::plain())
        .await
}

#[tokio::test]
async fn test_message_only_ack_is_not_queued() {
    let server = MockServer::start().await;
    answer_orders(&server, 201).await;
    let till = register_at(&server.uri()).await;

    let checkout = checkout_coke(&till).await.unwrap();
    assert!(!checkout.submission.is_queued());
    assert!(till.queue().is_empty().await.unwrap());
    assert!(till.cart().is_empty().await);
    assert_eq!(order_posts(&server).await, 1);
}

#[tokio::test]
async fn test_server_error_queues_then_replays_once() {
    let server = MockServer::start().await;
    answer_orders(&server, 503).await;
    let till = register_at(&server.uri()).await;

    let checkout = checkout_coke(&till).await.unwrap();
    assert!(checkout.submission.is_queued());
    assert_eq!(till.queue().len().await.unwrap(), 1);

    // Still failing: the pass stops on the status error and keeps the entry.
    let report = till.sync().await.unwrap();
    assert!(matches!(
        report.outcome,
        PassOutcome::Stopped {
            error: TillError::Transport(_),
            ..
        }
    ));
    assert_eq!(report.remaining, 1);

    // Resetting the mock also forgets the failed posts.
    answer_orders(&server, 201).await;
    let report = till.sync().await.unwrap();
    assert!(report.is_drained());
    assert_eq!(report.acked, vec![checkout.submission.order().id.clone()]);
    assert!(till.queue().is_empty().await.unwrap());

    let report = till.sync().await.unwrap();
    assert!(report.acked.is_empty());
    assert_eq!(order_posts(&server).await, 1);
}

#[tokio::test]
async fn test_unreachable_service_queues_order() {
    // Nothing listens on the discard port.
    let till = register_at("http://127.0.0.1:9").await;

    let checkout = checkout_coke(&till).await.unwrap();
    assert!(checkout.submission.is_queued());
    assert!(till.cart().is_empty().await);
}
