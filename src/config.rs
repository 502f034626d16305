//! Service configuration
//!
//! All settings come from environment variables; secrets are never hardcoded.
//! Gateway and notifier credentials are optional at startup: a missing Mollie
//! or Razorpay key only fails the calls that need it, and a missing Telegram
//! token turns alerting into a no-op.
//!
//! # Environment Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `MOLLIE_SECRET_KEY` | unset |
//! | `MOLLIE_API_BASE` | `https://api.mollie.com/v2` |
//! | `MOLLIE_REDIRECT_URL` | `{PAYWATCH_PUBLIC_URL}/success.html` |
//! | `MOLLIE_WEBHOOK_URL` | `{PAYWATCH_PUBLIC_URL}/api/mollie/webhook` |
//! | `MOLLIE_SUBSCRIPTION_PRICE` | `29.00` |
//! | `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` | unset |
//! | `RAZORPAY_PLAN_ID` | unset |
//! | `RAZORPAY_API_BASE` | `https://api.razorpay.com/v1` |
//! | `RAZORPAY_TOTAL_COUNT` | `400` |
//! | `RAZORPAY_PRODUCT_LABEL` | `Monthly Subscription` |
//! | `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` | unset |
//! | `TELEGRAM_API_BASE` | `https://api.telegram.org` |
//! | `PAYWATCH_PUBLIC_URL` | `http://localhost:3001` |
//! | `PAYWATCH_DEFAULT_PLAN` | `Main Subscription` |
//! | `PAYWATCH_DEDUP_WINDOW_SECS` | `60` |
//! | `PAYWATCH_SUBSCRIPTION_DELAY_SECS` | `8` |
//! | `PAYWATCH_HTTP_TIMEOUT_SECS` | `10` |
//! | `PAYWATCH_ALLOWED_ORIGINS` | empty (localhost only) |

use std::env;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::error::ConfigError;
use crate::mollie::types::EventDefaults;

const DEFAULT_MOLLIE_API_BASE: &str = "https://api.mollie.com/v2";
const DEFAULT_RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:3001";

/// Mollie mandate gateway settings
#[derive(Debug, Clone)]
pub struct MollieConfig {
    /// Bearer API key (from MOLLIE_SECRET_KEY)
    pub api_key: Option<String>,
    /// REST base, without trailing slash
    pub api_base: String,
    /// Where the hosted checkout sends the customer afterwards
    pub redirect_url: String,
    /// Webhook URL registered on each payment
    pub webhook_url: String,
    /// First-payment price for the fixed subscription checkout
    pub subscription_price: String,
    /// Currency for payments created by this service
    pub currency: String,
}

/// Razorpay subscription gateway settings
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    /// Basic-auth key id
    pub key_id: Option<String>,
    /// Basic-auth key secret
    pub key_secret: Option<String>,
    /// Plan the subscription checkout subscribes to
    pub plan_id: Option<String>,
    /// REST base, without trailing slash
    pub api_base: String,
    /// Billing cycles requested for new subscriptions
    pub total_count: u32,
    /// Product label stored in subscription notes
    pub product_label: String,
}

/// Telegram alert channel settings
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token; alerts are skipped when unset
    pub bot_token: Option<String>,
    /// Destination chat; alerts are skipped when unset
    pub chat_id: Option<String>,
    /// Bot API base, without trailing slash
    pub api_base: String,
}

impl TelegramConfig {
    /// Both credentials are present
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Mollie settings
    pub mollie: MollieConfig,
    /// Razorpay settings
    pub razorpay: RazorpayConfig,
    /// Telegram settings
    pub telegram: TelegramConfig,
    /// Plan label used when payment metadata has none
    pub default_plan: String,
    /// Duplicate suppression clearing interval
    pub dedup_window: Duration,
    /// Wait between an initial mandate payment and subscription creation
    pub subscription_delay: Duration,
    /// Timeout applied to every outbound call
    pub http_timeout: Duration,
    /// Origins allowed to call the checkout routes
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let public_url = parse_url(
            "PAYWATCH_PUBLIC_URL",
            get("PAYWATCH_PUBLIC_URL").unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string()),
        )?;
        let redirect_url = match get("MOLLIE_REDIRECT_URL") {
            Some(raw) => parse_url("MOLLIE_REDIRECT_URL", raw)?,
            None => join_url("PAYWATCH_PUBLIC_URL", &public_url, "success.html")?,
        };
        let webhook_url = match get("MOLLIE_WEBHOOK_URL") {
            Some(raw) => parse_url("MOLLIE_WEBHOOK_URL", raw)?,
            None => join_url("PAYWATCH_PUBLIC_URL", &public_url, "api/mollie/webhook")?,
        };

        let mollie = MollieConfig {
            api_key: get("MOLLIE_SECRET_KEY"),
            api_base: api_base("MOLLIE_API_BASE", get("MOLLIE_API_BASE"), DEFAULT_MOLLIE_API_BASE)?,
            redirect_url: redirect_url.to_string(),
            webhook_url: webhook_url.to_string(),
            subscription_price: get("MOLLIE_SUBSCRIPTION_PRICE")
                .unwrap_or_else(|| "29.00".to_string()),
            currency: "EUR".to_string(),
        };

        let razorpay = RazorpayConfig {
            key_id: get("RAZORPAY_KEY_ID"),
            key_secret: get("RAZORPAY_KEY_SECRET"),
            plan_id: get("RAZORPAY_PLAN_ID"),
            api_base: api_base(
                "RAZORPAY_API_BASE",
                get("RAZORPAY_API_BASE"),
                DEFAULT_RAZORPAY_API_BASE,
            )?,
            total_count: parse_number("RAZORPAY_TOTAL_COUNT", get("RAZORPAY_TOTAL_COUNT"), 400)?,
            product_label: get("RAZORPAY_PRODUCT_LABEL")
                .unwrap_or_else(|| "Monthly Subscription".to_string()),
        };

        let telegram = TelegramConfig {
            bot_token: get("TELEGRAM_BOT_TOKEN"),
            chat_id: get("TELEGRAM_CHAT_ID"),
            api_base: api_base(
                "TELEGRAM_API_BASE",
                get("TELEGRAM_API_BASE"),
                DEFAULT_TELEGRAM_API_BASE,
            )?,
        };

        let dedup_secs: u64 =
            parse_number("PAYWATCH_DEDUP_WINDOW_SECS", get("PAYWATCH_DEDUP_WINDOW_SECS"), 60)?;
        if dedup_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PAYWATCH_DEDUP_WINDOW_SECS",
                value: "0".to_string(),
                reason: "window must be at least one second".to_string(),
            });
        }
        let delay_secs: u64 = parse_number(
            "PAYWATCH_SUBSCRIPTION_DELAY_SECS",
            get("PAYWATCH_SUBSCRIPTION_DELAY_SECS"),
            8,
        )?;
        let timeout_secs: u64 =
            parse_number("PAYWATCH_HTTP_TIMEOUT_SECS", get("PAYWATCH_HTTP_TIMEOUT_SECS"), 10)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PAYWATCH_HTTP_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        let allowed_origins = get("PAYWATCH_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            mollie,
            razorpay,
            telegram,
            default_plan: get("PAYWATCH_DEFAULT_PLAN")
                .unwrap_or_else(|| "Main Subscription".to_string()),
            dedup_window: Duration::from_secs(dedup_secs),
            subscription_delay: Duration::from_secs(delay_secs),
            http_timeout: Duration::from_secs(timeout_secs),
            allowed_origins,
        };
        config.log_summary();
        Ok(config)
    }

    /// Fallbacks applied when Mollie payment metadata is incomplete
    pub fn event_defaults(&self) -> EventDefaults {
        EventDefaults {
            plan_type: self.default_plan.clone(),
            currency: self.mollie.currency.clone(),
        }
    }

    /// Configuration for tests: placeholder credentials, short timings
    pub fn test_config() -> Self {
        Self {
            mollie: MollieConfig {
                api_key: Some("test_mollie_key".to_string()),
                api_base: DEFAULT_MOLLIE_API_BASE.to_string(),
                redirect_url: "http://localhost:3001/success.html".to_string(),
                webhook_url: "http://localhost:3001/api/mollie/webhook".to_string(),
                subscription_price: "29.00".to_string(),
                currency: "EUR".to_string(),
            },
            razorpay: RazorpayConfig {
                key_id: Some("rzp_test_key".to_string()),
                key_secret: Some("rzp_test_secret".to_string()),
                plan_id: Some("plan_test".to_string()),
                api_base: DEFAULT_RAZORPAY_API_BASE.to_string(),
                total_count: 400,
                product_label: "Monthly Subscription".to_string(),
            },
            telegram: TelegramConfig {
                bot_token: None,
                chat_id: None,
                api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            },
            default_plan: "Main Subscription".to_string(),
            dedup_window: Duration::from_secs(60),
            subscription_delay: Duration::from_millis(20),
            http_timeout: Duration::from_secs(10),
            allowed_origins: Vec::new(),
        }
    }

    fn log_summary(&self) {
        if self.mollie.api_key.is_none() {
            warn!("MOLLIE_SECRET_KEY not set; Mollie calls will fail");
        }
        if self.razorpay.key_id.is_none() || self.razorpay.key_secret.is_none() {
            warn!("RAZORPAY_KEY_ID/RAZORPAY_KEY_SECRET not set; Razorpay checkout disabled");
        }
        if !self.telegram.is_configured() {
            warn!("TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set; alerts will be skipped");
        }
        info!(
            dedup_window_secs = self.dedup_window.as_secs(),
            subscription_delay_secs = self.subscription_delay.as_secs(),
            http_timeout_secs = self.http_timeout.as_secs(),
            allowed_origins = self.allowed_origins.len(),
            "Configuration loaded"
        );
    }
}

fn parse_url(key: &'static str, raw: String) -> Result<Url, ConfigError> {
    Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { key, source })
}

fn join_url(key: &'static str, base: &Url, path: &str) -> Result<Url, ConfigError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|source| ConfigError::InvalidUrl { key, source })
}

fn api_base(key: &'static str, raw: Option<String>, default: &str) -> Result<String, ConfigError> {
    let raw = raw.unwrap_or_else(|| default.to_string());
    parse_url(key, raw.clone())?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_number<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
