//! Razorpay alert templates

use crate::notifier::{MessageBuilder, NotificationCategory, NotificationMessage};
use crate::razorpay::types::{PaymentRecord, RazorpayEvent, SubscriptionRecord};

const SOURCE: &str = "Razorpay";

fn header(category: NotificationCategory) -> MessageBuilder {
    MessageBuilder::headline(category, "🏦", "Source", SOURCE)
}

/// Alert for an event, `None` for ignored events
pub fn for_event(event: &RazorpayEvent) -> Option<NotificationMessage> {
    let message = match event {
        RazorpayEvent::PaymentCaptured(payment) => payment_captured(payment),
        RazorpayEvent::SubscriptionCharged(sub) => subscription_charged(sub),
        RazorpayEvent::PaymentFailed(payment) => payment_failed(payment),
        RazorpayEvent::SubscriptionCancelled(sub) => subscription_cancelled(sub),
        RazorpayEvent::Ignored(_) => return None,
    };
    Some(message)
}

fn payment_captured(payment: &PaymentRecord) -> NotificationMessage {
    header(NotificationCategory::PaymentCaptured)
        .bold("💰", "New Payment Captured")
        .field("📦", "Product", &payment.product)
        .field("📧", "Email", &payment.contact.email)
        .field("📱", "Phone", &payment.contact.phone)
        .field("💵", "Amount", payment.amount_display())
        .field("🆔", "Payment ID", &payment.id)
        .build()
}

fn subscription_charged(sub: &SubscriptionRecord) -> NotificationMessage {
    header(NotificationCategory::RenewalSuccess)
        .bold("🔁", "Subscription Renewal Charged")
        .field("📦", "Product", &sub.product)
        .field("📧", "Email", &sub.contact.email)
        .field("📱", "Phone", &sub.contact.phone)
        .field("🧾", "Subscription ID", &sub.id)
        .field("💳", "Cycle Count", &sub.total_count)
        .build()
}

fn payment_failed(payment: &PaymentRecord) -> NotificationMessage {
    header(NotificationCategory::PaymentFailed)
        .bold("⚠️", "Payment Failed")
        .field("📧", "Email", &payment.contact.email)
        .field("📱", "Phone", &payment.contact.phone)
        .field("💵", "Amount", payment.amount_display())
        .field("❌", "Reason", payment.failure_reason())
        .field("🆔", "Payment ID", &payment.id)
        .build()
}

fn subscription_cancelled(sub: &SubscriptionRecord) -> NotificationMessage {
    let builder = if sub.is_rebill_failure() {
        header(NotificationCategory::SubscriptionRebillFailed)
            .bold("🚨", "Subscription Failed After Multiple Rebill Attempts!")
    } else {
        header(NotificationCategory::SubscriptionCancelled).bold("🚫", "Subscription Cancelled")
    };
    builder
        .field("📦", "Product", &sub.product)
        .field("📧", "Email", &sub.contact.email)
        .field("📱", "Phone", &sub.contact.phone)
        .field("🧾", "Subscription ID", &sub.id)
        .field("❌", "Reason", sub.cancel_reason())
        .build()
}
