//! Alert messages
//!
//! Every alert is Telegram MarkdownV2. [`MessageBuilder`] escapes all text it
//! is given, so templates never need to think about reserved characters; only
//! the bold markers it adds itself stay unescaped.

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Europe::Berlin;
use serde::{Deserialize, Serialize};

/// Divider line under every title
const DIVIDER: &str = "━━━━━━━━━━━━━━━";

/// Kind of alert, used for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationCategory {
    /// First mandate payment succeeded
    InitialPaymentSuccess,
    /// First (or unspecified) payment failed
    InitialPaymentFailed,
    /// Recurring charge succeeded
    RenewalSuccess,
    /// Recurring charge failed
    RenewalFailed,
    /// Checkout opened but not completed yet
    PaymentPending,
    /// Checkout abandoned
    PaymentExpired,
    /// Subscription created after an initial payment
    SubscriptionStarted,
    /// Subscription creation after an initial payment failed
    SubscriptionFailed,
    /// Subscription cancelled
    SubscriptionCancelled,
    /// Gateway reported a failure reason before the final status
    EarlyFailure,
    /// One-off payment captured
    PaymentCaptured,
    /// One-off payment failed
    PaymentFailed,
    /// Subscription cancelled after repeated failed rebills
    SubscriptionRebillFailed,
}

impl NotificationCategory {
    /// Kebab-case tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialPaymentSuccess => "initial-payment-success",
            Self::InitialPaymentFailed => "initial-payment-failed",
            Self::RenewalSuccess => "renewal-success",
            Self::RenewalFailed => "renewal-failed",
            Self::PaymentPending => "payment-pending",
            Self::PaymentExpired => "payment-expired",
            Self::SubscriptionStarted => "subscription-started",
            Self::SubscriptionFailed => "subscription-failed",
            Self::SubscriptionCancelled => "subscription-cancelled",
            Self::EarlyFailure => "early-failure",
            Self::PaymentCaptured => "payment-captured",
            Self::PaymentFailed => "payment-failed",
            Self::SubscriptionRebillFailed => "subscription-rebill-failed",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// What happened
    pub category: NotificationCategory,
    /// MarkdownV2 body
    pub text: String,
}

/// Escape Telegram MarkdownV2 reserved characters
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*'
                | '['
                | ']'
                | '('
                | ')'
                | '~'
                | '`'
                | '>'
                | '#'
                | '+'
                | '-'
                | '='
                | '|'
                | '{'
                | '}'
                | '.'
                | '!'
                | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Format an instant as Berlin local time, e.g. `16/10/2026, 14:03:11`
pub fn format_cet(at: DateTime<Utc>) -> String {
    at.with_timezone(&Berlin)
        .format("%d/%m/%Y, %H:%M:%S")
        .to_string()
}

/// Line-oriented MarkdownV2 message builder
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    category: NotificationCategory,
    lines: Vec<String>,
}

impl MessageBuilder {
    /// Start with `icon *TITLE*` and the divider
    pub fn new(category: NotificationCategory, icon: &str, title: &str) -> Self {
        Self {
            category,
            lines: vec![
                format!("{icon} *{}*", escape_markdown_v2(title)),
                DIVIDER.to_string(),
            ],
        }
    }

    /// Start with a bare header line (no divider)
    pub fn headline(category: NotificationCategory, icon: &str, label: &str, value: &str) -> Self {
        let mut builder = Self {
            category,
            lines: Vec::new(),
        };
        builder.push_field(icon, label, value);
        builder
    }

    /// `icon *Label:* value`
    pub fn field(mut self, icon: &str, label: &str, value: impl AsRef<str>) -> Self {
        self.push_field(icon, label, value.as_ref());
        self
    }

    /// Berlin-time stamp line
    pub fn time(self, at: DateTime<Utc>) -> Self {
        self.field("🕒", "Time", format!("{} (CET)", format_cet(at)))
    }

    /// `icon *TEXT*` without label
    pub fn bold(mut self, icon: &str, text: &str) -> Self {
        self.lines
            .push(format!("{icon} *{}*", escape_markdown_v2(text)));
        self
    }

    /// Plain escaped line
    pub fn line(mut self, text: &str) -> Self {
        self.lines.push(escape_markdown_v2(text));
        self
    }

    /// Finish
    pub fn build(self) -> NotificationMessage {
        NotificationMessage {
            category: self.category,
            text: self.lines.join("\n"),
        }
    }

    fn push_field(&mut self, icon: &str, label: &str, value: &str) {
        self.lines.push(format!(
            "{icon} *{}:* {}",
            escape_markdown_v2(label),
            escape_markdown_v2(value)
        ));
    }
}
