//! Mollie integration
//!
//! Mollie's webhook only carries a payment id, so every delivery is resolved
//! by fetching the payment, extracting a [`PaymentEvent`], classifying it and
//! alerting. Initial payments of recurring plans additionally schedule
//! subscription creation once Mollie has registered the mandate.
//!
//! ## Modules
//!
//! - `types` - wire types and the typed [`PaymentEvent`]
//! - `classify` - status/sequence to alert category
//! - `alerts` - alert templates
//! - `client` - [`MandateGateway`] and the REST client
//! - `webhook` - the orchestrator and its route
//! - `checkout` - customer + first-payment initiators

#![allow(missing_docs)]

pub mod alerts;
pub mod checkout;
pub mod classify;
pub mod client;
pub mod types;
pub mod webhook;

pub use classify::{classify, Classification};
pub use client::{CreatedPayment, MandateGateway, MollieClient, NewPayment, NewSubscription};
pub use types::{PaymentEvent, PaymentStatus, SequenceType, WebhookBody};
pub use webhook::{process_webhook, WebhookOutcome};
