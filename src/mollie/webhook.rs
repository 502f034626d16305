//! Mollie webhook orchestration
//!
//! # Flow
//!
//! ```text
//! POST /api/mollie/webhook
//!       |
//!       v
//! [Parse body] --> no id? --> 400
//!       |
//!       v
//! [Duplicate check] --> seen in window? --> 200 "Duplicate ignored"
//!       |
//!       v
//! [Fetch payment] --> gateway error? --> release id, 500
//!       |            (subscription callbacks skip the fetch)
//!       v
//! [Early failure alert] (open/failed with a reason)
//!       |
//!       v
//! [Classify + alert]
//!       |
//!       v
//! [Schedule subscription follow-up] (initial payment of a recurring plan)
//!       |
//!       v
//!      200
//! ```
//!
//! Alerts are best effort: a delivery failure is logged and never changes
//! the response.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::app::AppContext;
use crate::error::Error;
use crate::mollie::alerts;
use crate::mollie::classify::classify;
use crate::mollie::client::NewSubscription;
use crate::mollie::types::{two_decimals, Amount, PaymentEvent, PaymentMetadata, WebhookBody};
use crate::notifier::NotificationCategory;

/// Billing interval for follow-up subscriptions
pub const SUBSCRIPTION_INTERVAL: &str = "1 month";

/// What the orchestrator did with one delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum WebhookOutcome {
    /// Identifier already processed in the current window
    Duplicate,
    /// Processed; `alerts` lists the categories sent, in order
    Processed {
        /// Alert categories sent
        alerts: Vec<NotificationCategory>,
        /// A subscription follow-up was scheduled
        follow_up_scheduled: bool,
    },
}

/// Process one parsed webhook body
#[instrument(skip_all, fields(event_id = tracing::field::Empty))]
pub async fn process_webhook(ctx: &Arc<AppContext>, body: WebhookBody) -> Result<WebhookOutcome, Error> {
    let event_id = body.resource_id()?.to_string();
    tracing::Span::current().record("event_id", event_id.as_str());

    if !ctx.mollie_dedup.should_process(&event_id) {
        info!("Duplicate webhook ignored");
        ctx.stats.record_duplicate();
        return Ok(WebhookOutcome::Duplicate);
    }

    let defaults = ctx.config.event_defaults();
    let event = if body.is_subscription() {
        PaymentEvent::from_subscription_body(&event_id, &body, &defaults)
    } else {
        match ctx.mollie.fetch_payment(&event_id).await {
            Ok(event) => event,
            Err(e) => {
                // Let the gateway's retry through.
                ctx.mollie_dedup.release(&event_id);
                return Err(e.into());
            }
        }
    };

    info!(
        status = event.status.as_str(),
        sequence = event.sequence.as_str(),
        email = %event.email,
        plan = %event.plan_type,
        "Mollie event received"
    );

    let classification = classify(&event);
    let at = Utc::now();
    let mut sent = Vec::new();

    if let Some(reason) = &classification.early_failure {
        warn!(reason = %reason, "Payment failure reported early");
        ctx.notify(&alerts::early_failure(&event, reason, at)).await;
        sent.push(NotificationCategory::EarlyFailure);
    }

    let Some(category) = classification.category else {
        info!(
            status = event.status.as_str(),
            sequence = event.sequence.as_str(),
            "Unhandled payment state"
        );
        return Ok(WebhookOutcome::Processed {
            alerts: sent,
            follow_up_scheduled: false,
        });
    };

    let wants_follow_up =
        category == NotificationCategory::InitialPaymentSuccess && event.is_recurring_plan();
    let delay = ctx.config.subscription_delay;
    ctx.notify(&alerts::for_category(
        category,
        &event,
        at,
        wants_follow_up.then_some(delay),
    ))
    .await;
    sent.push(category);

    let follow_up_scheduled = wants_follow_up && schedule_follow_up(ctx, event);
    Ok(WebhookOutcome::Processed {
        alerts: sent,
        follow_up_scheduled,
    })
}

/// Hand subscription creation to the scheduler, keyed by payment id
fn schedule_follow_up(ctx: &Arc<AppContext>, event: PaymentEvent) -> bool {
    let task_ctx = Arc::clone(ctx);
    let span = info_span!("subscription_follow_up", payment_id = %event.id);
    let key = event.id.clone();

    let scheduled = ctx.scheduler.schedule(
        key,
        ctx.config.subscription_delay,
        async move {
            create_follow_up_subscription(&task_ctx, &event).await;
        }
        .instrument(span),
    );
    if scheduled {
        ctx.stats.record_follow_up();
    }
    scheduled
}

/// Create the recurring subscription for a paid initial payment and alert
/// on the outcome. Returns the subscription id on success.
pub async fn create_follow_up_subscription(ctx: &AppContext, event: &PaymentEvent) -> Option<String> {
    let at = Utc::now();
    let Some(customer_id) = event.customer_id.clone() else {
        warn!("Initial payment has no customer; cannot create subscription");
        ctx.notify(&alerts::subscription_failed(event, at)).await;
        return None;
    };

    let request = NewSubscription {
        customer_id,
        amount: Amount::new(
            two_decimals(&event.recurring_amount).unwrap_or_else(|| event.recurring_amount.clone()),
            event.amount.currency.clone(),
        ),
        interval: SUBSCRIPTION_INTERVAL.to_string(),
        description: format!("{} Subscription", event.plan_type),
        metadata: PaymentMetadata {
            email: Some(event.email.clone()),
            name: Some(event.name.clone()),
            plan_type: Some(event.plan_type.clone()),
            ..Default::default()
        },
    };

    match ctx.mollie.create_subscription(&request).await {
        Ok(subscription_id) => {
            info!(subscription_id = %subscription_id, "Subscription created");
            ctx.notify(&alerts::subscription_started(event, &subscription_id, at))
                .await;
            Some(subscription_id)
        }
        Err(e) => {
            error!(error = %e, "Subscription creation failed");
            ctx.notify(&alerts::subscription_failed(event, at)).await;
            None
        }
    }
}

async fn handle(ctx: &Arc<AppContext>, body: &[u8]) -> Result<WebhookOutcome, Error> {
    let body = WebhookBody::parse(body)?;
    process_webhook(ctx, body).await
}

/// `POST /api/mollie/webhook`
pub async fn mollie_webhook_handler(State(ctx): State<Arc<AppContext>>, body: Bytes) -> Response {
    let started = Instant::now();
    ctx.stats.record_webhook();

    let delivery_id = Uuid::new_v4();
    let result = handle(&ctx, &body)
        .instrument(info_span!("mollie_webhook", %delivery_id))
        .await;
    ctx.stats.record_latency(started.elapsed());

    match result {
        Ok(WebhookOutcome::Duplicate) => (StatusCode::OK, "Duplicate ignored").into_response(),
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(Error::Validation(e)) => {
            warn!(%delivery_id, error = %e, "Rejected Mollie webhook");
            (StatusCode::BAD_REQUEST, "Bad request").into_response()
        }
        Err(e) => {
            error!(%delivery_id, error = %e, "Mollie webhook failed");
            ctx.stats.record_error();
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
