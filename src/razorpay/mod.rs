//! Razorpay integration
//!
//! Webhook deliveries carry the full payment or subscription entity, so the
//! flow is parse, suppress duplicates, alert. The checkout initiator creates a
//! subscription on the configured plan for the Razorpay widget.

#![allow(missing_docs)]

pub mod alerts;
pub mod checkout;
pub mod client;
pub mod types;
pub mod webhook;

pub use client::{RazorpayClient, SubscriptionGateway, SubscriptionNotes, SubscriptionRequest};
pub use types::{Contact, PaymentRecord, RazorpayEvent, SubscriptionRecord};
pub use webhook::{process_event, RazorpayOutcome};
