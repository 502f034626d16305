//! HTTP handlers shared by every gateway
//!
//! Gateway-specific routes live with their gateway modules; this module holds
//! the health checks, the counters they report, and the JSON error response used by
//! the checkout initiators.

pub mod status;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ValidationError;

pub use status::{status_router, LatencyHistogram, ServiceStats};

/// JSON error body `{"error": ..., "details": ...}` with a status code
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// Response status
    pub status: StatusCode,
    /// `error` field
    pub error: Value,
    /// Optional `details` field
    pub details: Option<Value>,
}

impl ApiError {
    /// 400 with a message
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: Value::String(message.into()),
            details: None,
        }
    }

    /// 500 `Internal server error`
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: Value::String("Internal server error".to_string()),
            details: None,
        }
    }

    /// Attach a `details` payload
    pub fn with_details(mut self, details: Option<Value>) -> Self {
        self.details = details;
        self
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, turning extractor rejections into a 400
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(inner)| inner).map_err(|rejection| {
        warn!(error = %rejection, "Rejected request body");
        ValidationError::InvalidPayload(rejection.body_text()).into()
    })
}
