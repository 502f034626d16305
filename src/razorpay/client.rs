//! Razorpay REST client

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::RazorpayConfig;
use crate::error::GatewayError;

/// Free-form notes stored on the subscription
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub product: String,
}

/// `POST /subscriptions` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest {
    pub plan_id: String,
    pub total_count: u32,
    /// 1 lets Razorpay email the customer
    pub customer_notify: u8,
    pub notes: SubscriptionNotes,
}

/// Subscription-based payment gateway
#[async_trait::async_trait]
pub trait SubscriptionGateway: Send + Sync + 'static {
    /// Create a subscription, returning its id
    async fn create_subscription(&self, request: &SubscriptionRequest) -> Result<String, GatewayError>;
}

/// Razorpay v1 API client
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    config: RazorpayConfig,
    timeout: Duration,
}

impl RazorpayClient {
    /// Create a client using a shared HTTP client
    pub fn new(client: reqwest::Client, config: RazorpayConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), GatewayError> {
        let key_id = self
            .config
            .key_id
            .as_deref()
            .ok_or(GatewayError::MissingCredentials("RAZORPAY_KEY_ID"))?;
        let key_secret = self
            .config
            .key_secret
            .as_deref()
            .ok_or(GatewayError::MissingCredentials("RAZORPAY_KEY_SECRET"))?;
        Ok((key_id, key_secret))
    }
}

/// Subscription id from a response body; an `error` object is a rejection
fn subscription_id(body: Value) -> Result<String, GatewayError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(GatewayError::Rejected(error.clone()));
    }
    match body.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(GatewayError::MissingIdentifier {
            operation: "create_subscription",
            detail: body.to_string(),
        }),
    }
}

#[async_trait::async_trait]
impl SubscriptionGateway for RazorpayClient {
    #[instrument(skip_all, fields(plan_id = %request.plan_id))]
    async fn create_subscription(&self, request: &SubscriptionRequest) -> Result<String, GatewayError> {
        let (key_id, key_secret) = self.credentials()?;
        let timeout_ms = self.timeout.as_millis() as u64;

        let response = self
            .client
            .post(format!("{}/subscriptions", self.config.api_base))
            .basic_auth(key_id, Some(key_secret))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, timeout_ms))?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, timeout_ms))?;
        debug!(status, "Razorpay responded");
        subscription_id(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(key_id: Option<&str>) -> RazorpayConfig {
        RazorpayConfig {
            key_id: key_id.map(String::from),
            key_secret: Some("secret".to_string()),
            plan_id: Some("plan_1".to_string()),
            api_base: "http://127.0.0.1:9/v1".to_string(),
            total_count: 400,
            product_label: "Monthly Subscription".to_string(),
        }
    }

    fn request() -> SubscriptionRequest {
        SubscriptionRequest {
            plan_id: "plan_1".to_string(),
            total_count: 400,
            customer_notify: 1,
            notes: SubscriptionNotes {
                name: Some("Ravi".to_string()),
                email: None,
                phone: Some("+919876543210".to_string()),
                product: "Monthly Subscription".to_string(),
            },
        }
    }

    #[test]
    fn test_request_body_shape() {
        assert_eq!(
            serde_json::to_value(request()).unwrap(),
            json!({
                "plan_id": "plan_1",
                "total_count": 400,
                "customer_notify": 1,
                "notes": {"name": "Ravi", "phone": "+919876543210", "product": "Monthly Subscription"}
            })
        );
    }

    #[test]
    fn test_subscription_id_extraction() {
        assert_eq!(subscription_id(json!({"id": "sub_1", "status": "created"})).unwrap(), "sub_1");

        let err = subscription_id(json!({
            "error": {"code": "BAD_REQUEST_ERROR", "description": "The id provided does not exist"}
        }))
        .unwrap_err();
        assert_eq!(
            err.details(),
            Some(&json!({"code": "BAD_REQUEST_ERROR", "description": "The id provided does not exist"}))
        );

        assert!(matches!(
            subscription_id(json!({})),
            Err(GatewayError::MissingIdentifier { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let client = RazorpayClient::new(reqwest::Client::new(), config(None), Duration::from_secs(1));
        let err = client.create_subscription(&request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredentials("RAZORPAY_KEY_ID")));
    }

    #[tokio::test]
    async fn test_unreachable_gateway() {
        let client =
            RazorpayClient::new(reqwest::Client::new(), config(Some("rzp_test")), Duration::from_secs(1));
        let err = client.create_subscription(&request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_) | GatewayError::Timeout(_)));
    }
}
