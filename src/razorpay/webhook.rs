//! Razorpay webhook orchestration
//!
//! Razorpay pushes the full entity, so no fetch is needed: parse, suppress
//! re-deliveries by the `x-razorpay-event-id` header, alert, acknowledge.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::app::AppContext;
use crate::error::Error;
use crate::notifier::NotificationCategory;
use crate::razorpay::alerts;
use crate::razorpay::types::RazorpayEvent;

/// Header carrying Razorpay's per-event delivery id
pub const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// What happened to one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RazorpayOutcome {
    /// Event id already handled in the current window
    Duplicate,
    /// Alert sent
    Notified(NotificationCategory),
    /// Event type not alerted on
    Ignored,
}

/// Process one parsed event. `event_id` comes from the delivery header and
/// is optional; without it nothing is suppressed.
#[instrument(skip_all, fields(event = %event.name()))]
pub async fn process_event(
    ctx: &AppContext,
    event_id: Option<&str>,
    event: RazorpayEvent,
) -> RazorpayOutcome {
    if let Some(id) = event_id {
        if !ctx.razorpay_dedup.should_process(id) {
            info!(event_id = %id, "Duplicate webhook ignored");
            ctx.stats.record_duplicate();
            return RazorpayOutcome::Duplicate;
        }
    }

    let Some(message) = alerts::for_event(&event) else {
        info!("Razorpay event not alerted on");
        return RazorpayOutcome::Ignored;
    };

    let category = message.category;
    ctx.notify(&message).await;
    info!(category = %category, "Razorpay event processed");
    RazorpayOutcome::Notified(category)
}

async fn handle(ctx: &Arc<AppContext>, headers: &HeaderMap, body: &[u8]) -> Result<RazorpayOutcome, Error> {
    let event = RazorpayEvent::parse(body)?;
    let event_id = headers
        .get(EVENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    Ok(process_event(ctx, event_id, event).await)
}

/// `POST /api/razorpay/webhook`
pub async fn razorpay_webhook_handler(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    ctx.stats.record_webhook();

    let delivery_id = Uuid::new_v4();
    let result = handle(&ctx, &headers, &body)
        .instrument(info_span!("razorpay_webhook", %delivery_id))
        .await;
    ctx.stats.record_latency(started.elapsed());

    match result {
        Ok(RazorpayOutcome::Duplicate) => {
            (StatusCode::OK, Json(json!({ "status": "ok", "duplicate": true }))).into_response()
        }
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(Error::Validation(e)) => {
            warn!(%delivery_id, error = %e, "Rejected Razorpay webhook");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            error!(%delivery_id, error = %e, "Razorpay webhook failed");
            ctx.stats.record_error();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
