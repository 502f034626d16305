//! Mollie alert templates

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::mollie::types::{PaymentEvent, SequenceType};
use crate::notifier::{MessageBuilder, NotificationCategory, NotificationMessage};

const SOURCE: &str = "Mollie";

/// Failure reason reported while the payment is open or failed
pub fn early_failure(event: &PaymentEvent, reason: &str, at: DateTime<Utc>) -> NotificationMessage {
    MessageBuilder::new(
        NotificationCategory::EarlyFailure,
        "⚠️",
        "PAYMENT FAILED (EARLY DETECTED)",
    )
    .time(at)
    .field("🏦", "Source", SOURCE)
    .field("📧", "Email", &event.email)
    .field("👤", "Name", &event.name)
    .field("📦", "Plan", &event.plan_type)
    .field("❌", "Reason", reason)
    .field("💵", "Amount", event.amount.display())
    .field("🆔", "Payment ID", &event.id)
    .build()
}

/// Alert for a classified event.
///
/// `follow_up` is the subscription delay when an initial payment will be
/// followed by subscription creation.
pub fn for_category(
    category: NotificationCategory,
    event: &PaymentEvent,
    at: DateTime<Utc>,
    follow_up: Option<Duration>,
) -> NotificationMessage {
    use crate::notifier::NotificationCategory::*;

    match category {
        InitialPaymentSuccess => initial_success(event, at, follow_up),
        RenewalSuccess => summary(category, "🔁", "RENEWAL CHARGED", event, at).build(),
        RenewalFailed => summary(category, "⚠️", "RENEWAL FAILED", event, at).build(),
        InitialPaymentFailed => {
            let title = if event.sequence == SequenceType::First {
                "INITIAL PAYMENT FAILED"
            } else {
                "PAYMENT FAILED (UNSPECIFIED)"
            };
            summary(category, "❌", title, event, at).build()
        }
        PaymentPending => MessageBuilder::new(category, "🕓", "PAYMENT PENDING / OPEN")
            .time(at)
            .field("📧", "Email", &event.email)
            .field("📦", "Plan", &event.plan_type)
            .field("💵", "Amount", event.amount.display())
            .field("ℹ️", "Status", "Awaiting user completion")
            .build(),
        PaymentExpired => MessageBuilder::new(category, "⌛", "PAYMENT EXPIRED")
            .time(at)
            .field("📧", "Email", &event.email)
            .field("📦", "Plan", &event.plan_type)
            .field("💵", "Amount", event.amount.display())
            .field("ℹ️", "Status", "User didn't complete checkout")
            .build(),
        SubscriptionCancelled => MessageBuilder::new(category, "🚫", "SUBSCRIPTION CANCELLED")
            .time(at)
            .field("📧", "Email", &event.email)
            .field("📦", "Plan", &event.plan_type)
            .field("🆔", "Customer ID", event.customer_label())
            .build(),
        other => MessageBuilder::new(other, "ℹ️", other.as_str())
            .time(at)
            .field("🆔", "Payment ID", &event.id)
            .build(),
    }
}

/// Subscription created after the initial payment
pub fn subscription_started(
    event: &PaymentEvent,
    subscription_id: &str,
    at: DateTime<Utc>,
) -> NotificationMessage {
    MessageBuilder::new(
        NotificationCategory::SubscriptionStarted,
        "🧾",
        "SUBSCRIPTION STARTED",
    )
    .time(at)
    .field("🏦", "Source", SOURCE)
    .field("📧", "Email", &event.email)
    .field("👤", "Name", &event.name)
    .field("📦", "Plan", &event.plan_type)
    .field(
        "💳",
        "Recurring",
        format!("{} {}", event.amount.currency, event.recurring_amount),
    )
    .field("🧾", "Subscription ID", subscription_id)
    .field("🆔", "Customer ID", event.customer_label())
    .build()
}

/// Subscription creation after the initial payment failed
pub fn subscription_failed(event: &PaymentEvent, at: DateTime<Utc>) -> NotificationMessage {
    MessageBuilder::new(
        NotificationCategory::SubscriptionFailed,
        "🚫",
        "SUBSCRIPTION CREATION FAILED",
    )
    .time(at)
    .field("📧", "Email", &event.email)
    .field("👤", "Name", &event.name)
    .field("🆔", "Customer ID", event.customer_label())
    .build()
}

fn initial_success(
    event: &PaymentEvent,
    at: DateTime<Utc>,
    follow_up: Option<Duration>,
) -> NotificationMessage {
    let builder = MessageBuilder::new(
        NotificationCategory::InitialPaymentSuccess,
        "💰",
        "INITIAL PAYMENT SUCCESSFUL",
    )
    .time(at)
    .field("🏦", "Source", SOURCE)
    .field("📧", "Email", &event.email)
    .field("👤", "Name", &event.name)
    .field("📦", "Plan", &event.plan_type)
    .field("💵", "Initial", event.amount.display())
    .field(
        "💳",
        "Recurring",
        format!("{} {}", event.amount.currency, event.recurring_amount),
    )
    .field("🆔", "Payment ID", &event.id)
    .field("🆔", "Customer ID", event.customer_label());

    let builder = match follow_up {
        Some(delay) => builder.line(&format!(
            "⏳ Waiting {} seconds before creating subscription…",
            delay.as_secs()
        )),
        None => builder.line("✅ One-time purchase — no subscription."),
    };
    builder.build()
}

/// Shared layout for renewal and failure alerts
fn summary(
    category: NotificationCategory,
    icon: &str,
    title: &str,
    event: &PaymentEvent,
    at: DateTime<Utc>,
) -> MessageBuilder {
    MessageBuilder::new(category, icon, title)
        .time(at)
        .field("📧", "Email", &event.email)
        .field("📦", "Plan", &event.plan_type)
        .field("💵", "Amount", event.amount.display())
        .field("🆔", "Customer ID", event.customer_label())
}
