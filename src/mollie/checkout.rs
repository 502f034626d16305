//! Mollie checkout initiators
//!
//! Both flows create a customer and a `first` payment so Mollie stores a
//! mandate, then hand the hosted checkout URL back to the browser.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::app::AppContext;
use crate::error::{GatewayError, ValidationError};
use crate::handlers::{json_body, ApiError};
use crate::mollie::client::NewPayment;
use crate::mollie::types::{normalize_amount, Amount, PaymentMetadata};

/// Metadata marker on initial payments
pub const INITIAL_PAYMENT_KIND: &str = "initialPayment";

/// `POST /api/mollie/create-initial-payment` body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPaymentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// String or number
    #[serde(default)]
    pub initial_amount: Option<Value>,
    /// String or number; absent or zero means one-time purchase
    #[serde(default)]
    pub recurring_amount: Option<Value>,
    #[serde(default)]
    pub plan_type: Option<String>,
}

/// Successful initial payment creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPaymentResponse {
    pub checkout_url: String,
    pub customer_id: String,
    pub payment_id: String,
}

/// `POST /api/mollie/create-subscription` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionCheckoutRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Hosted checkout for the fixed-price subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCheckoutResponse {
    pub checkout_url: String,
}

/// Trimmed, non-empty text field
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Create a customer and an initial mandate payment
#[instrument(skip_all)]
pub async fn create_initial_payment(
    ctx: &AppContext,
    request: InitialPaymentRequest,
) -> Result<InitialPaymentResponse, ApiError> {
    let name = present(&request.name);
    let email = present(&request.email);
    let initial = request.initial_amount.as_ref().filter(|v| !v.is_null());
    let (Some(name), Some(email), Some(initial)) = (name, email, initial) else {
        return Err(ValidationError::missing(&[
            ("name", name.is_some()),
            ("email", email.is_some()),
            ("initialAmount", initial.is_some()),
        ])
        .into());
    };

    let initial_amount = normalize_amount("initialAmount", initial)?;
    let recurring_amount = match request.recurring_amount.as_ref().filter(|v| !v.is_null()) {
        Some(raw) => normalize_amount("recurringAmount", raw)?,
        None => "0.00".to_string(),
    };
    let plan_type = present(&request.plan_type)
        .map(str::to_string)
        .unwrap_or_else(|| ctx.config.default_plan.clone());

    let customer_id = ctx
        .mollie
        .create_customer(name, email)
        .await
        .map_err(|e| {
            warn!(error = %e, "Customer creation failed");
            ApiError::bad_request("Customer creation failed")
        })?;

    let payment = NewPayment {
        amount: Amount::new(initial_amount, ctx.config.mollie.currency.clone()),
        description: format!("{plan_type} Initial Payment"),
        redirect_url: ctx.config.mollie.redirect_url.clone(),
        webhook_url: ctx.config.mollie.webhook_url.clone(),
        customer_id: customer_id.clone(),
        sequence_type: "first".to_string(),
        metadata: PaymentMetadata {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            plan_type: Some(plan_type),
            recurring_amount: Some(recurring_amount),
            kind: Some(INITIAL_PAYMENT_KIND.to_string()),
        },
    };

    let created = ctx
        .mollie
        .create_payment(&payment)
        .await
        .map_err(|e| payment_error(&e))?;

    info!(customer_id = %customer_id, payment_id = %created.id, "Initial payment created");
    Ok(InitialPaymentResponse {
        checkout_url: created.checkout_url,
        customer_id,
        payment_id: created.id,
    })
}

/// Create a customer and a first payment at the configured subscription price.
///
/// The payment carries no recurring amount, so its webhook reports a
/// one-time purchase and schedules no follow-up subscription.
#[instrument(skip_all)]
pub async fn create_subscription_checkout(
    ctx: &AppContext,
    request: SubscriptionCheckoutRequest,
) -> Result<SubscriptionCheckoutResponse, ApiError> {
    let name = present(&request.name);
    let email = present(&request.email);
    let (Some(name), Some(email)) = (name, email) else {
        return Err(ValidationError::missing(&[("name", name.is_some()), ("email", email.is_some())]).into());
    };

    let price = normalize_amount(
        "subscriptionPrice",
        &Value::String(ctx.config.mollie.subscription_price.clone()),
    )
    .map_err(|e| {
        error!(error = %e, "MOLLIE_SUBSCRIPTION_PRICE is not a valid amount");
        ApiError::internal()
    })?;
    let plan_type = ctx.config.default_plan.clone();

    let customer_id = ctx
        .mollie
        .create_customer(name, email)
        .await
        .map_err(|e| {
            warn!(error = %e, "Customer creation failed");
            ApiError::bad_request("Customer creation failed")
        })?;

    let payment = NewPayment {
        amount: Amount::new(price, ctx.config.mollie.currency.clone()),
        description: format!("{plan_type} Monthly Membership"),
        redirect_url: ctx.config.mollie.redirect_url.clone(),
        webhook_url: ctx.config.mollie.webhook_url.clone(),
        customer_id: customer_id.clone(),
        sequence_type: "first".to_string(),
        metadata: PaymentMetadata {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            plan_type: Some(plan_type),
            recurring_amount: None,
            kind: None,
        },
    };

    let created = ctx.mollie.create_payment(&payment).await.map_err(|e| {
        warn!(error = %e, "Payment creation failed");
        ApiError::bad_request("Payment creation failed")
    })?;

    info!(customer_id = %customer_id, payment_id = %created.id, "Subscription checkout created");
    Ok(SubscriptionCheckoutResponse {
        checkout_url: created.checkout_url,
    })
}

fn payment_error(err: &GatewayError) -> ApiError {
    warn!(error = %err, "Payment creation failed");
    ApiError::bad_request("Failed to create payment").with_details(err.details().cloned())
}

/// `POST /api/mollie/create-initial-payment`
pub async fn create_initial_payment_handler(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<InitialPaymentRequest>, JsonRejection>,
) -> Result<Json<InitialPaymentResponse>, ApiError> {
    let request = json_body(body)?;
    create_initial_payment(&ctx, request).await.map(Json)
}

/// `POST /api/mollie/create-subscription`
pub async fn create_subscription_checkout_handler(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<SubscriptionCheckoutRequest>, JsonRejection>,
) -> Result<Json<SubscriptionCheckoutResponse>, ApiError> {
    let request = json_body(body)?;
    create_subscription_checkout(&ctx, request).await.map(Json)
}
