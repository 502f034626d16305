//! Razorpay subscription initiator
//!
//! Creates a subscription on the configured plan and returns what the
//! Razorpay checkout widget needs to open it.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::app::AppContext;
use crate::error::GatewayError;
use crate::handlers::{json_body, ApiError};
use crate::razorpay::client::{SubscriptionNotes, SubscriptionRequest};

/// `POST /api/razorpay/create-subscription` body; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSubscriptionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Widget parameters for a new subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscriptionResponse {
    pub success: bool,
    pub subscription_id: String,
    pub plan_id: String,
    pub key_id: String,
    pub message: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Create a subscription on the configured plan
#[instrument(skip_all)]
pub async fn create_subscription(
    ctx: &AppContext,
    request: CreateSubscriptionRequest,
) -> Result<CreateSubscriptionResponse, ApiError> {
    let config = &ctx.config.razorpay;
    let (Some(plan_id), Some(key_id)) = (config.plan_id.clone(), config.key_id.clone()) else {
        let missing = if config.plan_id.is_none() {
            "RAZORPAY_PLAN_ID"
        } else {
            "RAZORPAY_KEY_ID"
        };
        return Err(gateway_error(&GatewayError::MissingCredentials(missing)));
    };

    let subscription = SubscriptionRequest {
        plan_id: plan_id.clone(),
        total_count: config.total_count,
        customer_notify: 1,
        notes: SubscriptionNotes {
            name: non_empty(request.name),
            email: non_empty(request.email),
            phone: non_empty(request.phone),
            product: config.product_label.clone(),
        },
    };

    let subscription_id = ctx
        .razorpay
        .create_subscription(&subscription)
        .await
        .map_err(|e| gateway_error(&e))?;

    info!(subscription_id = %subscription_id, plan_id = %plan_id, "Razorpay subscription created");
    Ok(CreateSubscriptionResponse {
        success: true,
        subscription_id,
        plan_id,
        key_id,
        message: "Subscription created successfully".to_string(),
    })
}

/// `{"error": <razorpay error object>}` when Razorpay sent one, else the message
fn gateway_error(err: &GatewayError) -> ApiError {
    warn!(error = %err, "Razorpay subscription creation failed");
    match err {
        GatewayError::Rejected(detail) => ApiError {
            error: detail.clone(),
            ..ApiError::bad_request("")
        },
        other => ApiError::bad_request(other.to_string()),
    }
}

/// `POST /api/razorpay/create-subscription`
pub async fn create_subscription_handler(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<CreateSubscriptionRequest>, JsonRejection>,
) -> Result<Json<CreateSubscriptionResponse>, ApiError> {
    let request = json_body(body)?;
    create_subscription(&ctx, request).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejection_passes_error_object_through() {
        let err = gateway_error(&GatewayError::Rejected(json!({
            "code": "BAD_REQUEST_ERROR",
            "description": "The id provided does not exist"
        })));
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.error["code"], "BAD_REQUEST_ERROR");
    }

    #[test]
    fn test_other_errors_use_message() {
        let err = gateway_error(&GatewayError::Timeout(10_000));
        assert_eq!(err.error, json!("Gateway request timed out after 10000ms"));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(" +91 ".to_string())).as_deref(), Some("+91"));
        assert_eq!(non_empty(Some(String::new())), None);
    }
}
