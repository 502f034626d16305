//! Chat alerting
//!
//! [`Notifier`] is the seam between the webhook orchestrators and the alert
//! channel. Delivery problems are reported as [`NotifierError`] by
//! implementations, but callers go through [`Notifier::notify`], which logs
//! and swallows them: a failed alert must never fail or retry a webhook.

pub mod message;
pub mod telegram;

use tracing::{info, warn};

use crate::error::NotifierError;

pub use message::{escape_markdown_v2, format_cet, MessageBuilder, NotificationCategory, NotificationMessage};
pub use telegram::TelegramNotifier;

/// Alert channel
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver one message
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifierError>;

    /// Deliver one message, logging instead of returning failures.
    ///
    /// Returns whether the message went out.
    async fn notify(&self, message: &NotificationMessage) -> bool {
        match self.deliver(message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    category = %message.category,
                    error = %e,
                    "Alert delivery failed"
                );
                false
            }
        }
    }
}

/// Notifier that only logs, for dry runs
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifierError> {
        info!(category = %message.category, text = %message.text, "Alert (dry run)");
        Ok(())
    }
}
