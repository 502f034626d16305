//! Mollie event classification
//!
//! Classification works on an already-extracted [`PaymentEvent`], so every
//! field the alerts need is available to every branch. Rules are evaluated top
//! to bottom and the first match wins; the early-failure check is independent
//! and runs before them.

use serde::Serialize;

use crate::mollie::types::{PaymentEvent, PaymentStatus, ResourceKind, SequenceType};
use crate::notifier::NotificationCategory;

/// Outcome of classifying one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Failure reason worth an early alert, if any
    pub early_failure: Option<String>,
    /// Main category; `None` means acknowledge without alerting
    pub category: Option<NotificationCategory>,
}

/// Failure reason present while the payment is still open or already failed
pub fn early_failure(event: &PaymentEvent) -> Option<&str> {
    match event.status {
        PaymentStatus::Open | PaymentStatus::Failed => event.failure_reason.as_deref(),
        _ => None,
    }
}

/// Main category for an event, first match wins
pub fn category(event: &PaymentEvent) -> Option<NotificationCategory> {
    use crate::notifier::NotificationCategory::*;

    // Subscription callbacks only alert on cancellation.
    if event.resource == ResourceKind::Subscription {
        return (event.status == PaymentStatus::Canceled).then_some(SubscriptionCancelled);
    }

    match (event.status, event.sequence) {
        (PaymentStatus::Paid, SequenceType::First) => Some(InitialPaymentSuccess),
        (PaymentStatus::Paid, SequenceType::Recurring) => Some(RenewalSuccess),
        (PaymentStatus::Failed, SequenceType::Recurring) => Some(RenewalFailed),
        (PaymentStatus::Failed, _) => Some(InitialPaymentFailed),
        (PaymentStatus::Open, _) => Some(PaymentPending),
        (PaymentStatus::Expired, _) => Some(PaymentExpired),
        _ => None,
    }
}

/// Classify an event
pub fn classify(event: &PaymentEvent) -> Classification {
    Classification {
        early_failure: early_failure(event).map(str::to_string),
        category: category(event),
    }
}
