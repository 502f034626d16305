//! Error types for paywatch
//!
//! One `thiserror` hierarchy shared by the webhook orchestrators, the
//! checkout initiators, and the outbound clients. HTTP status mapping lives
//! with the handlers because the same [`GatewayError`] means 400 in a checkout
//! flow and 500 in a webhook flow.

use thiserror::Error;

/// The main error type for paywatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Inbound request is missing required data
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Upstream payment gateway failed or returned nothing usable
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Startup configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Inbound request validation errors (always HTTP 400)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields were absent or empty
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Body could not be decoded
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Webhook body carried no event identifier
    #[error("Webhook payload has no identifier")]
    MissingEventId,

    /// A field was present but malformed
    #[error("Invalid value for {field}: {value}")]
    InvalidField {
        /// Field name as sent by the caller
        field: &'static str,
        /// Offending value
        value: String,
    },
}

impl ValidationError {
    /// [`ValidationError::MissingFields`] naming every field flagged absent
    pub fn missing(fields: &[(&'static str, bool)]) -> Self {
        ValidationError::MissingFields(
            fields
                .iter()
                .filter(|(_, present)| !present)
                .map(|(name, _)| *name)
                .collect(),
        )
    }
}

/// Payment gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Credential for the gateway is not configured
    #[error("{0} is not configured")]
    MissingCredentials(&'static str),

    /// Response had no identifier for the requested object
    #[error("{operation} returned no identifier: {detail}")]
    MissingIdentifier {
        /// Gateway operation, e.g. `fetch_payment`
        operation: &'static str,
        /// Error detail reported by the gateway, if any
        detail: String,
    },

    /// Payment was created without a usable checkout link
    #[error("Payment creation failed (HTTP {status}): {detail}")]
    CheckoutUnavailable {
        /// HTTP status returned by the gateway
        status: u16,
        /// Raw gateway response body
        detail: serde_json::Value,
    },

    /// Gateway answered with an explicit error object
    #[error("Gateway rejected request: {0}")]
    Rejected(serde_json::Value),

    /// Request timed out
    #[error("Gateway request timed out after {0}ms")]
    Timeout(u64),

    /// Connection or protocol failure
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// Response body was not the expected JSON
    #[error("Gateway response could not be decoded: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Map a reqwest failure, keeping timeouts distinct
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(timeout_ms)
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    /// Raw gateway body worth echoing back to a checkout caller
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            GatewayError::CheckoutUnavailable { detail, .. } => Some(detail),
            GatewayError::Rejected(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Alert delivery errors. Never surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum NotifierError {
    /// Connection or protocol failure
    #[error("Notifier transport error: {0}")]
    Transport(String),

    /// Request timed out
    #[error("Notifier request timed out after {0}ms")]
    Timeout(u64),

    /// Chat API refused the message
    #[error("Notifier rejected message (HTTP {status}): {description}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Description returned by the chat API
        description: String,
    },
}

/// Startup configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable holds an unusable value
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Environment variable name
        key: &'static str,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A URL setting does not parse
    #[error("Invalid URL in {key}: {source}")]
    InvalidUrl {
        /// Environment variable name
        key: &'static str,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },
}

/// Result type alias for paywatch operations
pub type Result<T> = std::result::Result<T, Error>;
