//! Application wiring
//!
//! [`AppContext`] owns every component a handler needs (gateway clients,
//! notifier, suppressors, scheduler, counters) and is shared as axum state.
//! Components sit behind traits so tests can swap in fakes.
//!
//! ```text
//! POST /api/mollie/webhook ───────────▶ mollie::webhook ──┐
//! POST /api/mollie/create-* ──────────▶ mollie::checkout  ├─▶ MandateGateway
//! POST /api/razorpay/webhook ─────────▶ razorpay::webhook ├─▶ Notifier
//! POST /api/razorpay/create-subscription ▶ razorpay::checkout ─▶ SubscriptionGateway
//! GET  /health /ready /status ────────▶ handlers::status
//! ```

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::cors::cors_layer;
use crate::dedup::DuplicateSuppressor;
use crate::error::{Error, GatewayError};
use crate::handlers::status::{status_router, ServiceStats};
use crate::mollie::client::{MandateGateway, MollieClient};
use crate::notifier::{LogNotifier, NotificationMessage, Notifier, TelegramNotifier};
use crate::razorpay::client::{RazorpayClient, SubscriptionGateway};
use crate::scheduler::FollowUpScheduler;
use crate::{mollie, razorpay};

/// Shared state behind every route
pub struct AppContext {
    /// Loaded configuration
    pub config: AppConfig,
    /// Mollie client
    pub mollie: Arc<dyn MandateGateway>,
    /// Razorpay client
    pub razorpay: Arc<dyn SubscriptionGateway>,
    /// Alert channel
    pub notifier: Arc<dyn Notifier>,
    /// Mollie webhook duplicate guard
    pub mollie_dedup: DuplicateSuppressor,
    /// Razorpay webhook duplicate guard
    pub razorpay_dedup: DuplicateSuppressor,
    /// Deferred subscription creation
    pub scheduler: FollowUpScheduler,
    /// Counters for `/status`
    pub stats: ServiceStats,
}

impl AppContext {
    /// Assemble a context from explicit components on the system clock
    pub fn new(
        config: AppConfig,
        mollie: Arc<dyn MandateGateway>,
        razorpay: Arc<dyn SubscriptionGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_clock(config, mollie, razorpay, notifier, Arc::new(SystemClock))
    }

    /// Assemble a context whose suppressors use `clock`
    pub fn with_clock(
        config: AppConfig,
        mollie: Arc<dyn MandateGateway>,
        razorpay: Arc<dyn SubscriptionGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let window = config.dedup_window;
        Self {
            mollie,
            razorpay,
            notifier,
            mollie_dedup: DuplicateSuppressor::with_clock(window, Arc::clone(&clock)),
            razorpay_dedup: DuplicateSuppressor::with_clock(window, clock),
            scheduler: FollowUpScheduler::new(),
            stats: ServiceStats::new(),
            config,
        }
    }

    /// Load configuration from the process environment and build production
    /// clients
    pub fn from_env(dry_run: bool) -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok(), dry_run)
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F, dry_run: bool) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = AppConfig::from_lookup(lookup)?;
        Self::from_config(config, dry_run)
    }

    /// Build production clients from configuration.
    ///
    /// With `dry_run`, alerts are logged instead of sent.
    pub fn from_config(config: AppConfig, dry_run: bool) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let mollie = MollieClient::new(
            http.clone(),
            config.mollie.clone(),
            config.event_defaults(),
            config.http_timeout,
        );
        let razorpay = RazorpayClient::new(http.clone(), config.razorpay.clone(), config.http_timeout);
        let notifier: Arc<dyn Notifier> = if dry_run {
            Arc::new(LogNotifier)
        } else {
            Arc::new(TelegramNotifier::new(
                http,
                config.telegram.clone(),
                config.http_timeout,
            ))
        };

        Ok(Self::new(config, Arc::new(mollie), Arc::new(razorpay), notifier))
    }

    /// Send an alert through the notifier, counting the outcome
    pub async fn notify(&self, message: &NotificationMessage) -> bool {
        let delivered = self.notifier.notify(message).await;
        self.stats.record_notification(delivered);
        delivered
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("mollie_dedup", &self.mollie_dedup)
            .field("razorpay_dedup", &self.razorpay_dedup)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Build the full HTTP router
pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config.allowed_origins);

    Router::new()
        .route("/api/mollie/webhook", post(mollie::webhook::mollie_webhook_handler))
        .route(
            "/api/mollie/create-initial-payment",
            post(mollie::checkout::create_initial_payment_handler),
        )
        .route(
            "/api/mollie/create-subscription",
            post(mollie::checkout::create_subscription_checkout_handler),
        )
        .route("/api/razorpay/webhook", post(razorpay::webhook::razorpay_webhook_handler))
        .route(
            "/api/razorpay/create-subscription",
            post(razorpay::checkout::create_subscription_handler),
        )
        .merge(status_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_environment_is_config_error() {
        let err = AppContext::from_lookup(
            |key| (key == "PAYWATCH_HTTP_TIMEOUT_SECS").then(|| "ten".to_string()),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_dry_run_context_from_defaults() {
        let ctx = AppContext::from_lookup(|_| None, true).unwrap();
        assert_eq!(ctx.config.dedup_window.as_secs(), 60);
        assert!(ctx.mollie_dedup.is_empty());
        assert!(!ctx.scheduler.is_shut_down());
    }
}
