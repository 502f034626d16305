//! Razorpay webhook payloads
//!
//! Entities are read as raw JSON because Razorpay scatters contact details
//! over several optional fields depending on how the payment was made. Each
//! delivery is turned into one [`RazorpayEvent`] with every default applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

pub const EVENT_PAYMENT_CAPTURED: &str = "payment.captured";
pub const EVENT_SUBSCRIPTION_CHARGED: &str = "subscription.charged";
pub const EVENT_PAYMENT_FAILED: &str = "payment.failed";
pub const EVENT_SUBSCRIPTION_CANCELLED: &str = "subscription.cancelled";

const EMAIL_FIELDS: [&str; 6] = [
    "/email",
    "/customer_email",
    "/customer_details/email",
    "/notes/email",
    "/contact_email",
    "/customer_notify_email",
];

const PHONE_FIELDS: [&str; 5] = [
    "/contact",
    "/customer_contact",
    "/customer_details/contact",
    "/notes/phone",
    "/phone",
];

const PAYMENT_PRODUCT_FIELDS: [&str; 3] = [
    "/notes/product",
    "/notes/plan_name",
    "/notes/subscription_name",
];

const SUBSCRIPTION_PRODUCT_FIELDS: [&str; 2] = ["/notes/product", "/plan_id"];

/// Cancel reasons that mean Razorpay gave up after failed charges
const REBILL_FAILURE_MARKERS: [&str; 2] = ["multiple failed rebill", "failed payment"];

/// String or number at a JSON pointer; empty strings count as absent
fn text_at(entity: &Value, pointer: &str) -> Option<String> {
    match entity.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty value among `pointers`
fn first_text(entity: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| text_at(entity, p))
}

/// Minor units rendered as a two-decimal major amount, e.g. `49900` -> `499.00`
pub fn minor_units_display(entity: &Value) -> String {
    let minor = match entity.get("amount") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .unwrap_or(0.0);
    format!("{:.2}", minor / 100.0)
}

/// Customer contact details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub phone: String,
}

impl Contact {
    /// Extract from any payment or subscription entity; `N/A` when absent
    pub fn from_entity(entity: &Value) -> Self {
        Self {
            email: first_text(entity, &EMAIL_FIELDS).unwrap_or_else(|| "N/A".to_string()),
            phone: first_text(entity, &PHONE_FIELDS).unwrap_or_else(|| "N/A".to_string()),
        }
    }
}

/// A payment entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    /// Major units, two decimals
    pub amount: String,
    pub currency: String,
    pub product: String,
    pub contact: Contact,
    pub error_description: Option<String>,
}

impl PaymentRecord {
    /// Extract a payment entity
    pub fn from_entity(entity: &Value) -> Self {
        Self {
            id: text_at(entity, "/id").unwrap_or_else(|| "N/A".to_string()),
            amount: minor_units_display(entity),
            currency: text_at(entity, "/currency").unwrap_or_else(|| "INR".to_string()),
            product: first_text(entity, &PAYMENT_PRODUCT_FIELDS)
                .unwrap_or_else(|| "Subscription (via Razorpay Button)".to_string()),
            contact: Contact::from_entity(entity),
            error_description: text_at(entity, "/error_description"),
        }
    }

    /// `INR 499.00`
    pub fn amount_display(&self) -> String {
        format!("{} {}", self.currency, self.amount)
    }

    /// Failure description or `Unknown reason`
    pub fn failure_reason(&self) -> &str {
        self.error_description.as_deref().unwrap_or("Unknown reason")
    }
}

/// A subscription entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub product: String,
    /// Billing cycles, `∞` when unbounded
    pub total_count: String,
    pub cancel_reason: Option<String>,
    pub contact: Contact,
}

impl SubscriptionRecord {
    /// Extract a subscription entity, labelling it `default_product` when the
    /// entity has neither a product note nor a plan id
    pub fn from_entity(entity: &Value, default_product: &str) -> Self {
        Self {
            id: text_at(entity, "/id").unwrap_or_else(|| "N/A".to_string()),
            product: first_text(entity, &SUBSCRIPTION_PRODUCT_FIELDS)
                .unwrap_or_else(|| default_product.to_string()),
            total_count: text_at(entity, "/total_count")
                .filter(|c| c != "0")
                .unwrap_or_else(|| "∞".to_string()),
            cancel_reason: text_at(entity, "/cancel_reason"),
            contact: Contact::from_entity(entity),
        }
    }

    /// Cancel reason or the generic default
    pub fn cancel_reason(&self) -> &str {
        self.cancel_reason
            .as_deref()
            .unwrap_or("Cancelled manually or after failed rebills")
    }

    /// Cancelled because renewals kept failing
    pub fn is_rebill_failure(&self) -> bool {
        let reason = self.cancel_reason();
        REBILL_FAILURE_MARKERS.iter().any(|m| reason.contains(m))
    }
}

/// One Razorpay delivery, typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RazorpayEvent {
    PaymentCaptured(PaymentRecord),
    SubscriptionCharged(SubscriptionRecord),
    PaymentFailed(PaymentRecord),
    SubscriptionCancelled(SubscriptionRecord),
    /// Event type not alerted on, or its entity was missing
    Ignored(String),
}

impl RazorpayEvent {
    /// Parse a webhook body, unwrapping a JSON-encoded string body first.
    pub fn parse(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::from_value(&Value::Null));
        }
        let mut body: Value = serde_json::from_slice(bytes)
            .map_err(|e| ValidationError::InvalidPayload(e.to_string()))?;
        if let Value::String(inner) = &body {
            body = serde_json::from_str(inner)
                .map_err(|e| ValidationError::InvalidPayload(e.to_string()))?;
        }
        if !body.is_object() && !body.is_null() {
            return Err(ValidationError::InvalidPayload(
                "webhook body is not a JSON object".to_string(),
            ));
        }
        Ok(Self::from_value(&body))
    }

    /// Classify an already decoded body
    pub fn from_value(body: &Value) -> Self {
        let event = body
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let payment = body.pointer("/payload/payment/entity").filter(|e| e.is_object());
        let subscription = body
            .pointer("/payload/subscription/entity")
            .filter(|e| e.is_object());

        match (event.as_str(), payment, subscription) {
            (EVENT_PAYMENT_CAPTURED, Some(entity), _) => {
                Self::PaymentCaptured(PaymentRecord::from_entity(entity))
            }
            (EVENT_SUBSCRIPTION_CHARGED, _, Some(entity)) => Self::SubscriptionCharged(
                SubscriptionRecord::from_entity(entity, "Razorpay Subscription Plan"),
            ),
            (EVENT_PAYMENT_FAILED, Some(entity), _) => {
                Self::PaymentFailed(PaymentRecord::from_entity(entity))
            }
            (EVENT_SUBSCRIPTION_CANCELLED, _, Some(entity)) => Self::SubscriptionCancelled(
                SubscriptionRecord::from_entity(entity, "Razorpay Plan"),
            ),
            _ => Self::Ignored(event),
        }
    }

    /// Event name for logging
    pub fn name(&self) -> &str {
        match self {
            Self::PaymentCaptured(_) => EVENT_PAYMENT_CAPTURED,
            Self::SubscriptionCharged(_) => EVENT_SUBSCRIPTION_CHARGED,
            Self::PaymentFailed(_) => EVENT_PAYMENT_FAILED,
            Self::SubscriptionCancelled(_) => EVENT_SUBSCRIPTION_CANCELLED,
            Self::Ignored(event) => event,
        }
    }
}
