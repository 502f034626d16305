//! Mollie checkout initiator and health endpoint tests

mod common;

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{json, payment, Harness};
use paywatch::mollie::types::{PaymentStatus, SequenceType};

const INITIAL: &str = "/api/mollie/create-initial-payment";
const SUBSCRIPTION: &str = "/api/mollie/create-subscription";

// ============================================================================
// Initial payment
// ============================================================================

#[tokio::test]
async fn test_initial_payment_success() {
    let h = Harness::new();
    let (status, body) = h
        .post_json(
            INITIAL,
            json!({
                "name": "Jane Doe",
                "email": "jane@example.com",
                "initialAmount": 49,
                "recurringAmount": "29.5",
                "planType": "Gold"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body),
        json!({
            "checkoutUrl": "https://www.mollie.com/checkout/test",
            "customerId": "cst_test",
            "paymentId": "tr_created"
        })
    );

    let payments = h.mollie.created_payments.lock().clone();
    assert_eq!(payments.len(), 1);
    let created = &payments[0];
    assert_eq!(created.amount.value, "49.00");
    assert_eq!(created.amount.currency, "EUR");
    assert_eq!(created.description, "Gold Initial Payment");
    assert_eq!(created.sequence_type, "first");
    assert_eq!(created.customer_id, "cst_test");
    assert_eq!(created.metadata.recurring_amount.as_deref(), Some("29.50"));
    assert_eq!(created.metadata.kind.as_deref(), Some("initialPayment"));
}

#[tokio::test]
async fn test_initial_payment_defaults() {
    let h = Harness::new();
    let (status, _) = h
        .post_json(
            INITIAL,
            json!({ "name": "Jane", "email": "jane@example.com", "initialAmount": "10" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let created = h.mollie.created_payments.lock()[0].clone();
    assert_eq!(created.description, "Main Subscription Initial Payment");
    assert_eq!(created.metadata.recurring_amount.as_deref(), Some("0.00"));
}

#[tokio::test]
async fn test_initial_payment_missing_fields() {
    let h = Harness::new();
    let (status, body) = h.post_json(INITIAL, json!({ "name": "  " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json(&body)["error"],
        "Missing required fields: name, email, initialAmount"
    );
    assert!(h.mollie.created_payments.lock().is_empty());
}

#[tokio::test]
async fn test_initial_payment_invalid_amount() {
    let h = Harness::new();
    let (status, _) = h
        .post_json(
            INITIAL,
            json!({ "name": "Jane", "email": "jane@example.com", "initialAmount": "ten" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = Harness::new();
    let (status, body) = h
        .send(
            Request::post(INITIAL)
                .header("content-type", "application/json")
                .body(Body::from("{\"name\":"))
                .expect("valid request"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].is_string());
}

#[tokio::test]
async fn test_customer_failure() {
    let h = Harness::new();
    h.mollie.fail_customer.store(true, Ordering::SeqCst);

    let (status, body) = h
        .post_json(
            INITIAL,
            json!({ "name": "Jane", "email": "bad", "initialAmount": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body), json!({ "error": "Customer creation failed" }));
}

#[tokio::test]
async fn test_payment_failure_carries_details() {
    let h = Harness::new();
    h.mollie.fail_payment.store(true, Ordering::SeqCst);

    let (status, body) = h
        .post_json(
            INITIAL,
            json!({ "name": "Jane", "email": "jane@example.com", "initialAmount": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json(&body),
        json!({
            "error": "Failed to create payment",
            "details": { "title": "Unprocessable Entity", "field": "amount" }
        })
    );
}

// ============================================================================
// Fixed-price subscription checkout
// ============================================================================

#[tokio::test]
async fn test_subscription_checkout() {
    let h = Harness::new();
    let (status, body) = h
        .post_json(SUBSCRIPTION, json!({ "name": "Jane", "email": "jane@example.com" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json(&body),
        json!({ "checkoutUrl": "https://www.mollie.com/checkout/test" })
    );

    let created = h.mollie.created_payments.lock()[0].clone();
    assert_eq!(created.amount.value, "29.00");
    assert_eq!(created.description, "Main Subscription Monthly Membership");
    assert_eq!(created.metadata.recurring_amount, None);
    assert_eq!(created.metadata.plan_type.as_deref(), Some("Main Subscription"));
}

#[tokio::test]
async fn test_subscription_checkout_payment_failure() {
    let h = Harness::new();
    h.mollie.fail_payment.store(true, Ordering::SeqCst);

    let (status, body) = h
        .post_json(SUBSCRIPTION, json!({ "name": "Jane", "email": "jane@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body), json!({ "error": "Payment creation failed" }));
}

#[tokio::test]
async fn test_subscription_checkout_payment_is_one_time() {
    let h = Harness::new();
    h.post_json(SUBSCRIPTION, json!({ "name": "Jane", "email": "jane@example.com" }))
        .await;
    let created = h.mollie.created_payments.lock()[0].clone();

    // Mollie reports the paid first payment back with the same metadata.
    let mut paid = payment("tr_created", PaymentStatus::Paid, SequenceType::First);
    paid.plan_type = created.metadata.plan_type.clone().unwrap_or_default();
    paid.recurring_amount = created
        .metadata
        .recurring_amount
        .clone()
        .unwrap_or_else(|| "0.00".to_string());
    h.mollie.insert(paid);

    let (status, _) = h.post_form("/api/mollie/webhook", "id=tr_created").await;
    assert_eq!(status, StatusCode::OK);
    h.settle().await;

    assert!(h.mollie.subscriptions.lock().is_empty());
    assert!(h.notifier.messages()[0].text.contains("One\\-time purchase"));
}

#[tokio::test]
async fn test_subscription_checkout_missing_email() {
    let h = Harness::new();
    let (status, body) = h.post_json(SUBSCRIPTION, json!({ "name": "Jane" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "Missing required fields: email");
}

// ============================================================================
// Health endpoints
// ============================================================================

#[tokio::test]
async fn test_health() {
    let h = Harness::new();
    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "healthy");
}

#[tokio::test]
async fn test_ready_until_shutdown() {
    let h = Harness::new();
    let (status, _) = h.get("/ready").await;
    assert_eq!(status, StatusCode::OK);

    h.ctx.scheduler.shutdown();
    let (status, body) = h.get("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["status"], "shutting-down");
}

#[tokio::test]
async fn test_status_reports_counters() {
    let h = Harness::new();
    h.mollie
        .insert(payment("tr_stat", PaymentStatus::Paid, SequenceType::Recurring));
    h.post_form("/api/mollie/webhook", "id=tr_stat").await;
    h.post_form("/api/mollie/webhook", "id=tr_stat").await;

    let (status, body) = h.get("/status").await;
    assert_eq!(status, StatusCode::OK);

    let status = json(&body);
    assert_eq!(status["name"], "paywatch");
    assert_eq!(status["webhooks_received"], 2);
    assert_eq!(status["duplicates_suppressed"], 1);
    assert_eq!(status["notifications_sent"], 1);
    assert_eq!(status["dedup_entries"]["mollie"], 1);
    assert_eq!(status["latency"]["total_requests"], 2);
}

#[tokio::test]
async fn test_cors_preflight_from_localhost() {
    let h = Harness::new();
    let response = h
        .send(
            Request::builder()
                .method("OPTIONS")
                .uri(INITIAL)
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await;
    assert_eq!(response.0, StatusCode::OK);
}
