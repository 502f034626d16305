//! Shared fixtures for the HTTP-level tests
//!
//! In-memory gateways and a recording notifier behind a real router, so the
//! tests drive the same code path as a live delivery.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use paywatch::clock::ManualClock;
use paywatch::config::AppConfig;
use paywatch::error::{GatewayError, NotifierError};
use paywatch::mollie::types::{Amount, PaymentStatus, ResourceKind, SequenceType};
use paywatch::mollie::{CreatedPayment, MandateGateway, NewPayment, NewSubscription, PaymentEvent};
use paywatch::razorpay::{SubscriptionGateway, SubscriptionRequest};
use paywatch::{router, AppContext, NotificationCategory, NotificationMessage, Notifier};

// ============================================================================
// Mollie
// ============================================================================

/// In-memory Mollie
#[derive(Default)]
pub struct MockMollie {
    payments: Mutex<HashMap<String, PaymentEvent>>,
    pub fetch_calls: AtomicUsize,
    pub fail_fetch: AtomicBool,
    pub fail_customer: AtomicBool,
    pub fail_payment: AtomicBool,
    pub fail_subscription: AtomicBool,
    pub created_payments: Mutex<Vec<NewPayment>>,
    pub subscriptions: Mutex<Vec<NewSubscription>>,
}

impl MockMollie {
    pub fn insert(&self, event: PaymentEvent) {
        self.payments.lock().insert(event.id.clone(), event);
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MandateGateway for MockMollie {
    async fn create_customer(&self, _name: &str, _email: &str) -> Result<String, GatewayError> {
        if self.fail_customer.load(Ordering::SeqCst) {
            return Err(GatewayError::MissingIdentifier {
                operation: "create_customer",
                detail: "invalid email".to_string(),
            });
        }
        Ok("cst_test".to_string())
    }

    async fn create_payment(&self, payment: &NewPayment) -> Result<CreatedPayment, GatewayError> {
        self.created_payments.lock().push(payment.clone());
        if self.fail_payment.load(Ordering::SeqCst) {
            return Err(GatewayError::CheckoutUnavailable {
                status: 422,
                detail: serde_json::json!({ "title": "Unprocessable Entity", "field": "amount" }),
            });
        }
        Ok(CreatedPayment {
            id: "tr_created".to_string(),
            checkout_url: "https://www.mollie.com/checkout/test".to_string(),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentEvent, GatewayError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }
        self.payments
            .lock()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::MissingIdentifier {
                operation: "fetch_payment",
                detail: format!("no payment {payment_id}"),
            })
    }

    async fn create_subscription(&self, subscription: &NewSubscription) -> Result<String, GatewayError> {
        self.subscriptions.lock().push(subscription.clone());
        if self.fail_subscription.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected(serde_json::json!({ "title": "No mandate" })));
        }
        Ok("sub_test".to_string())
    }
}

/// A fetched payment with sensible defaults
pub fn payment(id: &str, status: PaymentStatus, sequence: SequenceType) -> PaymentEvent {
    PaymentEvent {
        id: id.to_string(),
        resource: ResourceKind::Payment,
        status,
        sequence,
        amount: Amount::new("49.00", "EUR"),
        customer_id: Some("cst_test".to_string()),
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        plan_type: "Gold".to_string(),
        recurring_amount: "29.00".to_string(),
        failure_reason: None,
    }
}

// ============================================================================
// Razorpay
// ============================================================================

/// In-memory Razorpay
#[derive(Default)]
pub struct MockRazorpay {
    pub requests: Mutex<Vec<SubscriptionRequest>>,
    pub reject: AtomicBool,
}

#[async_trait::async_trait]
impl SubscriptionGateway for MockRazorpay {
    async fn create_subscription(&self, request: &SubscriptionRequest) -> Result<String, GatewayError> {
        self.requests.lock().push(request.clone());
        if self.reject.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected(serde_json::json!({
                "code": "BAD_REQUEST_ERROR",
                "description": "The id provided does not exist"
            })));
        }
        Ok("sub_rzp_test".to_string())
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Keeps every message it is given; optionally reports failure
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<NotificationMessage>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn categories(&self) -> Vec<NotificationCategory> {
        self.messages.lock().iter().map(|m| m.category).collect()
    }

    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifierError> {
        self.messages.lock().push(message.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifierError::Transport("telegram unreachable".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub ctx: Arc<AppContext>,
    pub mollie: Arc<MockMollie>,
    pub razorpay: Arc<MockRazorpay>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AppConfig::test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let mollie = Arc::new(MockMollie::default());
        let razorpay = Arc::new(MockRazorpay::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new());
        let ctx = Arc::new(AppContext::with_clock(
            config,
            mollie.clone(),
            razorpay.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        Self {
            ctx,
            mollie,
            razorpay,
            notifier,
            clock,
        }
    }

    /// Send one request through a fresh router; returns status and body text
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = router(Arc::clone(&self.ctx))
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (StatusCode, String) {
        self.send(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
    }

    pub async fn post_form(&self, path: &str, body: &str) -> (StatusCode, String) {
        self.send(
            Request::post(path)
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        self.send(Request::get(path).body(Body::empty()).expect("valid request"))
            .await
    }

    /// Wait for scheduled follow-ups to finish
    pub async fn settle(&self) {
        self.ctx.scheduler.drain().await;
    }
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("JSON response body")
}
