//! Mollie REST client
//!
//! [`MandateGateway`] is the seam the webhook orchestrator and the checkout
//! initiators depend on; [`MollieClient`] is the production implementation.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::MollieConfig;
use crate::error::GatewayError;
use crate::mollie::types::{Amount, EventDefaults, MolliePayment, PaymentEvent, PaymentMetadata};

/// Payment creation request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub amount: Amount,
    pub description: String,
    pub redirect_url: String,
    pub webhook_url: String,
    pub customer_id: String,
    /// `first` for mandate-creating payments
    pub sequence_type: String,
    pub metadata: PaymentMetadata,
}

/// A created payment with its hosted checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayment {
    pub id: String,
    pub checkout_url: String,
}

/// Subscription creation request for an existing customer
#[derive(Debug, Clone, Serialize)]
pub struct NewSubscription {
    #[serde(skip)]
    pub customer_id: String,
    pub amount: Amount,
    /// e.g. `1 month`
    pub interval: String,
    pub description: String,
    pub metadata: PaymentMetadata,
}

/// Operations against a mandate-based payment gateway
#[async_trait::async_trait]
pub trait MandateGateway: Send + Sync + 'static {
    /// Create a customer, returning its id
    async fn create_customer(&self, name: &str, email: &str) -> Result<String, GatewayError>;

    /// Create a payment with a hosted checkout
    async fn create_payment(&self, payment: &NewPayment) -> Result<CreatedPayment, GatewayError>;

    /// Fetch a payment and extract it into a typed event
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentEvent, GatewayError>;

    /// Create a recurring subscription, returning its id
    async fn create_subscription(&self, subscription: &NewSubscription) -> Result<String, GatewayError>;
}

/// Mollie v2 API client
#[derive(Debug, Clone)]
pub struct MollieClient {
    client: reqwest::Client,
    config: MollieConfig,
    defaults: EventDefaults,
    timeout: Duration,
}

impl MollieClient {
    /// Create a client using a shared HTTP client
    pub fn new(
        client: reqwest::Client,
        config: MollieConfig,
        defaults: EventDefaults,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            config,
            defaults,
            timeout,
        }
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(GatewayError::MissingCredentials("MOLLIE_SECRET_KEY"))
    }

    /// `api_base` with each segment appended percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| GatewayError::Transport(format!("invalid MOLLIE_API_BASE: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport("MOLLIE_API_BASE cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Send a request and decode whatever JSON comes back, error bodies included
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, Value), GatewayError> {
        let response = request
            .bearer_auth(self.api_key()?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, self.timeout_ms()))?;

        let status = response.status().as_u16();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, self.timeout_ms()))?;
        debug!(status, "Mollie responded");
        Ok((status, body))
    }
}

/// `id` field of a response, or a [`GatewayError::MissingIdentifier`]
/// carrying Mollie's error `detail`/`title`
fn require_id(operation: &'static str, body: &Value) -> Result<String, GatewayError> {
    match body.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(GatewayError::MissingIdentifier {
            operation,
            detail: body
                .get("detail")
                .or_else(|| body.get("title"))
                .and_then(Value::as_str)
                .unwrap_or("no error detail")
                .to_string(),
        }),
    }
}

/// A created payment, only from a 201 carrying both an id and a checkout link
fn created_payment(status: u16, body: Value) -> Result<CreatedPayment, GatewayError> {
    let parsed: MolliePayment = serde_json::from_value(body.clone()).unwrap_or_default();
    match (status, parsed.id.as_deref(), parsed.checkout_url()) {
        (201, Some(id), Some(checkout)) if !id.is_empty() => Ok(CreatedPayment {
            id: id.to_string(),
            checkout_url: checkout.to_string(),
        }),
        _ => Err(GatewayError::CheckoutUnavailable {
            status,
            detail: body,
        }),
    }
}

#[async_trait::async_trait]
impl MandateGateway for MollieClient {
    #[instrument(skip_all)]
    async fn create_customer(&self, name: &str, email: &str) -> Result<String, GatewayError> {
        let request = self
            .client
            .post(self.url(&["customers"])?)
            .json(&serde_json::json!({ "name": name, "email": email }));
        let (_, body) = self.send(request).await?;
        require_id("create_customer", &body)
    }

    #[instrument(skip_all, fields(customer_id = %payment.customer_id))]
    async fn create_payment(&self, payment: &NewPayment) -> Result<CreatedPayment, GatewayError> {
        let request = self.client.post(self.url(&["payments"])?).json(payment);
        let (status, body) = self.send(request).await?;
        created_payment(status, body)
    }

    #[instrument(skip(self))]
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentEvent, GatewayError> {
        let request = self.client.get(self.url(&["payments", payment_id])?);
        let (_, body) = self.send(request).await?;
        require_id("fetch_payment", &body)?;

        let payment: MolliePayment =
            serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        PaymentEvent::from_payment(payment, &self.defaults)
    }

    #[instrument(skip_all, fields(customer_id = %subscription.customer_id))]
    async fn create_subscription(&self, subscription: &NewSubscription) -> Result<String, GatewayError> {
        let request = self
            .client
            .post(self.url(&[
                "customers",
                &subscription.customer_id,
                "subscriptions",
            ])?)
            .json(subscription);
        let (_, body) = self.send(request).await?;
        require_id("create_subscription", &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(api_key: Option<&str>) -> MollieClient {
        MollieClient::new(
            reqwest::Client::new(),
            MollieConfig {
                api_key: api_key.map(String::from),
                api_base: "http://127.0.0.1:9/v2".to_string(),
                redirect_url: "http://localhost/success.html".to_string(),
                webhook_url: "http://localhost/api/mollie/webhook".to_string(),
                subscription_price: "29.00".to_string(),
                currency: "EUR".to_string(),
            },
            EventDefaults {
                plan_type: "Main Subscription".to_string(),
                currency: "EUR".to_string(),
            },
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id("op", &json!({"id": "cst_1"})).unwrap(), "cst_1");

        let err = require_id("fetch_payment", &json!({"status": 404, "title": "Not Found", "detail": "No payment exists with token tr_x."}))
            .unwrap_err();
        assert!(err.to_string().contains("No payment exists"));

        assert!(require_id("op", &json!({"id": ""})).is_err());
    }

    #[test]
    fn test_url_encodes_segments() {
        let client = client(Some("test_key"));
        assert_eq!(
            client.url(&["payments", "tr_1"]).unwrap().as_str(),
            "http://127.0.0.1:9/v2/payments/tr_1"
        );
        assert_eq!(
            client
                .url(&["payments", "../customers/cst_x?testmode=true"])
                .unwrap()
                .as_str(),
            "http://127.0.0.1:9/v2/payments/..%2Fcustomers%2Fcst_x%3Ftestmode=true"
        );
    }

    #[test]
    fn test_created_payment_requires_201_and_checkout() {
        let with_link = json!({
            "id": "tr_1",
            "_links": {"checkout": {"href": "https://www.mollie.com/checkout/tr_1"}}
        });

        let created = created_payment(201, with_link.clone()).unwrap();
        assert_eq!(created.id, "tr_1");
        assert_eq!(created.checkout_url, "https://www.mollie.com/checkout/tr_1");

        let err = created_payment(200, with_link).unwrap_err();
        assert!(matches!(err, GatewayError::CheckoutUnavailable { status: 200, .. }));

        let no_link = json!({"id": "tr_2", "_links": {}});
        match created_payment(201, no_link.clone()).unwrap_err() {
            GatewayError::CheckoutUnavailable { status, detail } => {
                assert_eq!(status, 201);
                assert_eq!(detail, no_link);
            }
            other => panic!("unexpected error: {other}"),
        }

        let rejected = json!({"status": 422, "title": "Unprocessable Entity"});
        assert!(created_payment(422, rejected).is_err());
    }

    #[test]
    fn test_subscription_body_shape() {
        let sub = NewSubscription {
            customer_id: "cst_1".to_string(),
            amount: Amount::new("29.00", "EUR"),
            interval: "1 month".to_string(),
            description: "Gold Subscription".to_string(),
            metadata: PaymentMetadata {
                email: Some("jane@example.com".to_string()),
                name: Some("Jane".to_string()),
                plan_type: Some("Gold".to_string()),
                ..Default::default()
            },
        };
        let body = serde_json::to_value(&sub).unwrap();
        assert_eq!(
            body,
            json!({
                "amount": {"value": "29.00", "currency": "EUR"},
                "interval": "1 month",
                "description": "Gold Subscription",
                "metadata": {"name": "Jane", "email": "jane@example.com", "planType": "Gold"}
            })
        );
    }

    #[test]
    fn test_payment_body_shape() {
        let payment = NewPayment {
            amount: Amount::new("49.00", "EUR"),
            description: "Gold Initial Payment".to_string(),
            redirect_url: "http://localhost/success.html".to_string(),
            webhook_url: "http://localhost/api/mollie/webhook".to_string(),
            customer_id: "cst_1".to_string(),
            sequence_type: "first".to_string(),
            metadata: PaymentMetadata::default(),
        };
        let body = serde_json::to_value(&payment).unwrap();
        assert_eq!(body["sequenceType"], "first");
        assert_eq!(body["customerId"], "cst_1");
        assert_eq!(body["redirectUrl"], "http://localhost/success.html");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let err = client(None).fetch_payment("tr_1").await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials("MOLLIE_SECRET_KEY")));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transport_error() {
        let err = client(Some("test_key")).create_customer("Jane", "jane@example.com").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_) | GatewayError::Timeout(_)));
    }
}
