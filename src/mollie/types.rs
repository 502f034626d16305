//! Mollie wire types and the typed payment event
//!
//! Mollie objects are parsed leniently (everything optional) and then turned
//! into a [`PaymentEvent`] once, with explicit defaults, before any
//! classification happens.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, ValidationError};

/// Payment status as reported by Mollie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Failed,
    Open,
    Expired,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl FromStr for PaymentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl PaymentStatus {
    /// Parse, mapping anything unrecognised to `Unknown`
    pub fn parse(s: &str) -> Self {
        match s {
            "paid" => Self::Paid,
            "failed" => Self::Failed,
            "open" => Self::Open,
            "expired" => Self::Expired,
            "canceled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Open => "open",
            Self::Expired => "expired",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }
}

/// Position of a payment in a mandate series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    First,
    Recurring,
    #[serde(other)]
    Unknown,
}

impl SequenceType {
    /// Parse, mapping anything unrecognised (including `oneoff`) to `Unknown`
    pub fn parse(s: &str) -> Self {
        match s {
            "first" => Self::First,
            "recurring" => Self::Recurring,
            _ => Self::Unknown,
        }
    }

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Recurring => "recurring",
            Self::Unknown => "unknown",
        }
    }
}

/// Mollie amount object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Decimal string, e.g. `"10.00"`
    pub value: String,
    /// ISO 4217 code
    pub currency: String,
}

impl Amount {
    /// Build an amount
    pub fn new(value: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            currency: currency.into(),
        }
    }

    /// `"EUR 10.00"`
    pub fn display(&self) -> String {
        format!("{} {}", self.currency, self.value)
    }
}

/// Normalise a caller-supplied amount (string or number) to Mollie's
/// two-decimal string form.
pub fn normalize_amount(field: &'static str, raw: &Value) -> Result<String, ValidationError> {
    let parsed = match raw {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(format!("{v:.2}")),
        _ => Err(ValidationError::InvalidField {
            field,
            value: raw.to_string(),
        }),
    }
}

/// `"29"` -> `"29.00"`; `None` if the text is not a non-negative number
pub fn two_decimals(value: &str) -> Option<String> {
    normalize_amount("amount", &Value::String(value.to_string())).ok()
}

/// Whether a decimal string is strictly positive
pub fn is_positive_amount(value: &str) -> bool {
    value.trim().parse::<f64>().map(|v| v > 0.0).unwrap_or(false)
}

/// Mollie identifiers are ASCII alphanumerics and underscores
pub fn is_resource_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Accept JSON strings and numbers as text, ignore anything else
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| value_to_text(&v)))
}

/// String or number as text; empty strings count as absent
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Metadata this service attaches to payments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMetadata {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub recurring_amount: Option<String>,
    /// Free-form marker, e.g. `initialPayment`
    #[serde(default, rename = "type", deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// `details` sub-object of a payment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// HAL link
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

/// HAL links of a payment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentLinks {
    #[serde(default)]
    pub checkout: Option<Link>,
}

/// Payment object as returned by `GET /payments/{id}` and `POST /payments`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MolliePayment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sequence_type: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Metadata is whatever JSON the creator attached
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub details: Option<PaymentDetails>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// String or `{code, message}` object
    #[serde(default)]
    pub status_reason: Option<Value>,
    #[serde(default, rename = "_links")]
    pub links: Option<PaymentLinks>,
}

impl MolliePayment {
    /// Checkout URL, if the payment has one
    pub fn checkout_url(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.checkout.as_ref())
            .map(|c| c.href.as_str())
    }

    /// First failure reason among `details.failureReason`, `failureReason`
    /// and `statusReason`
    pub fn failure_reason(&self) -> Option<String> {
        self.details
            .as_ref()
            .and_then(|d| d.failure_reason.clone())
            .or_else(|| self.failure_reason.clone())
            .or_else(|| self.status_reason.as_ref().and_then(status_reason_text))
            .filter(|r| !r.is_empty())
    }

    /// Parsed metadata; non-object metadata counts as empty
    pub fn parsed_metadata(&self) -> PaymentMetadata {
        self.metadata
            .as_ref()
            .filter(|m| m.is_object())
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default()
    }
}

fn status_reason_text(reason: &Value) -> Option<String> {
    match reason {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("code"))
            .and_then(value_to_text),
        _ => None,
    }
}

/// Body Mollie posts to the webhook
///
/// Mollie itself sends `id=tr_...` form-encoded; JSON callers may use
/// `paymentId` instead. Subscription callbacks carry `resource`/`status`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl WebhookBody {
    /// Parse a JSON or form-encoded body
    pub fn parse(bytes: &[u8]) -> Result<Self, ValidationError> {
        if let Ok(body) = serde_json::from_slice::<Self>(bytes) {
            return Ok(body);
        }
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }
        if bytes.first().map_or(false, |b| *b == b'{' || *b == b'[') {
            return Err(ValidationError::InvalidPayload(
                "malformed JSON body".to_string(),
            ));
        }

        let mut body = Self::default();
        for (key, value) in url::form_urlencoded::parse(bytes) {
            let value = value.into_owned();
            match key.as_ref() {
                "id" => body.id = Some(value),
                "paymentId" => body.payment_id = Some(value),
                "resource" => body.resource = Some(value),
                "status" => body.status = Some(value),
                "customerId" => body.customer_id = Some(value),
                _ => {}
            }
        }
        Ok(body)
    }

    /// `id`, falling back to `paymentId`
    pub fn event_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.payment_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    /// [`event_id`](Self::event_id), rejected unless it is a plain Mollie
    /// resource token (`tr_...`, `sub_...`)
    pub fn resource_id(&self) -> Result<&str, ValidationError> {
        let id = self.event_id().ok_or(ValidationError::MissingEventId)?;
        if !is_resource_id(id) {
            return Err(ValidationError::InvalidField {
                field: "id",
                value: id.to_string(),
            });
        }
        Ok(id)
    }

    /// Callback concerns a subscription rather than a payment
    pub fn is_subscription(&self) -> bool {
        self.resource.as_deref() == Some("subscription")
    }
}

/// Defaults applied when payment metadata is incomplete
#[derive(Debug, Clone)]
pub struct EventDefaults {
    /// Plan label when metadata has none
    pub plan_type: String,
    /// Currency when the payment has no amount
    pub currency: String,
}

/// Which Mollie resource an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Payment,
    Subscription,
}

/// Fully extracted payment (or subscription) state, ready to classify
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
    pub id: String,
    pub resource: ResourceKind,
    pub status: PaymentStatus,
    pub sequence: SequenceType,
    pub amount: Amount,
    pub customer_id: Option<String>,
    pub name: String,
    pub email: String,
    pub plan_type: String,
    /// Decimal string; `"0.00"` when absent
    pub recurring_amount: String,
    pub failure_reason: Option<String>,
}

impl PaymentEvent {
    /// Extract every field from a fetched payment
    pub fn from_payment(payment: MolliePayment, defaults: &EventDefaults) -> Result<Self, GatewayError> {
        let id = payment
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::MissingIdentifier {
                operation: "fetch_payment",
                detail: "payment has no id".to_string(),
            })?;
        let metadata = payment.parsed_metadata();

        Ok(Self {
            failure_reason: payment.failure_reason(),
            status: payment
                .status
                .as_deref()
                .map(PaymentStatus::parse)
                .unwrap_or(PaymentStatus::Unknown),
            sequence: payment
                .sequence_type
                .as_deref()
                .map(SequenceType::parse)
                .unwrap_or(SequenceType::Unknown),
            amount: payment
                .amount
                .clone()
                .unwrap_or_else(|| Amount::new("0.00", defaults.currency.clone())),
            customer_id: payment.customer_id.clone(),
            name: metadata.name.unwrap_or_else(|| "Unknown".to_string()),
            email: metadata
                .email
                .or(payment.customer_email)
                .unwrap_or_else(|| "N/A".to_string()),
            plan_type: metadata
                .plan_type
                .unwrap_or_else(|| defaults.plan_type.clone()),
            recurring_amount: metadata
                .recurring_amount
                .unwrap_or_else(|| "0.00".to_string()),
            resource: ResourceKind::Payment,
            id,
        })
    }

    /// Build an event from a subscription callback body
    pub fn from_subscription_body(
        id: &str,
        body: &WebhookBody,
        defaults: &EventDefaults,
    ) -> Self {
        let metadata: PaymentMetadata = body
            .metadata
            .as_ref()
            .filter(|m| m.is_object())
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default();

        Self {
            id: id.to_string(),
            resource: ResourceKind::Subscription,
            status: body
                .status
                .as_deref()
                .map(PaymentStatus::parse)
                .unwrap_or(PaymentStatus::Unknown),
            sequence: SequenceType::Unknown,
            amount: Amount::new("0.00", defaults.currency.clone()),
            customer_id: body.customer_id.clone(),
            name: metadata.name.unwrap_or_else(|| "Unknown".to_string()),
            email: metadata.email.unwrap_or_else(|| "N/A".to_string()),
            plan_type: metadata
                .plan_type
                .unwrap_or_else(|| defaults.plan_type.clone()),
            recurring_amount: metadata
                .recurring_amount
                .unwrap_or_else(|| "0.00".to_string()),
            failure_reason: None,
        }
    }

    /// Recurring amount is strictly positive
    pub fn is_recurring_plan(&self) -> bool {
        is_positive_amount(&self.recurring_amount)
    }

    /// Customer id or `N/A` for display
    pub fn customer_label(&self) -> &str {
        self.customer_id.as_deref().unwrap_or("N/A")
    }
}
