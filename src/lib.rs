//! paywatch - Payment Webhook Alerting
//!
//! Receives Mollie and Razorpay webhooks, works out what happened to the
//! payment or subscription, and posts a formatted alert to a Telegram chat.
//! Also exposes the checkout initiators the storefront calls to start a
//! Mollie mandate payment or a Razorpay subscription.
//!
//! # Features
//!
//! - **Duplicate suppression**: gateway re-deliveries inside a fixed window
//!   are acknowledged without a second alert
//! - **Classification**: Mollie status and sequence type map to one alert
//!   category, plus an early alert when a failure reason shows up first
//! - **Deferred subscriptions**: a paid initial payment of a recurring plan
//!   creates the Mollie subscription after a short delay, off the request path
//! - **Best-effort alerting**: alert failures are logged, never surfaced
//!
//! # Architecture
//!
//! ```text
//! Mollie ──▶ /api/mollie/webhook ──▶ dedup ──▶ fetch ──▶ classify ──▶ Telegram
//!                                                          │
//!                                                          ▼
//!                                              FollowUpScheduler (delay)
//!                                                          │
//!                                                          ▼
//!                                              create subscription ──▶ Telegram
//!
//! Razorpay ──▶ /api/razorpay/webhook ──▶ dedup ──▶ parse ──▶ Telegram
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paywatch::app::{router, AppContext};
//! use paywatch::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let ctx = Arc::new(AppContext::from_config(config, false)?);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//!     axum::serve(listener, router(ctx)).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod app;
pub mod clock;
pub mod config;
pub mod cors;
pub mod dedup;
pub mod error;
pub mod handlers;
pub mod mollie;
pub mod notifier;
pub mod razorpay;
pub mod scheduler;

// Re-exports for convenience
pub use app::{router, AppContext};
pub use config::AppConfig;
pub use dedup::DuplicateSuppressor;
pub use error::{Error, Result};
pub use notifier::{NotificationCategory, NotificationMessage, Notifier};
pub use scheduler::FollowUpScheduler;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
