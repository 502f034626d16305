//! Telegram Bot API notifier

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::TelegramConfig;
use crate::error::NotifierError;
use crate::notifier::{NotificationMessage, Notifier};

/// `sendMessage` request body
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Bot API envelope; only the failure fields matter here
#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends alerts to one Telegram chat
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
    timeout: Duration,
}

impl TelegramNotifier {
    /// Create a notifier using a shared HTTP client
    pub fn new(client: reqwest::Client, config: TelegramConfig, timeout: Duration) -> Self {
        Self {
            client,
            config,
            timeout,
        }
    }

    fn endpoint(&self, token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.config.api_base, token)
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip_all, fields(category = %message.category))]
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifierError> {
        let (Some(token), Some(chat_id)) = (&self.config.bot_token, &self.config.chat_id) else {
            debug!("Telegram not configured; skipping alert");
            return Ok(());
        };

        let timeout_ms = self.timeout.as_millis() as u64;
        let response = self
            .client
            .post(self.endpoint(token))
            .timeout(self.timeout)
            .json(&SendMessage {
                chat_id,
                text: &message.text,
                parse_mode: "MarkdownV2",
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifierError::Timeout(timeout_ms)
                } else {
                    NotifierError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let reply: Option<ApiReply> = response.json().await.ok();
        match reply {
            Some(ApiReply { ok: true, .. }) if status.is_success() => {
                debug!("Alert delivered");
                Ok(())
            }
            other => Err(NotifierError::Rejected {
                status: status.as_u16(),
                description: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}
