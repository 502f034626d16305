//! CORS policy for the checkout routes
//!
//! The storefront calls the checkout initiators from the browser. Origins come
//! from `PAYWATCH_ALLOWED_ORIGINS`; with none configured, only loopback
//! origins are accepted so a local front end works out of the box.
//!
//! # Policy
//!
//! - **Allowed Origins**: configured list (exact match), else `localhost`,
//!   `127.0.0.1` and `[::1]` on any port
//! - **Allowed Methods**: GET, POST, OPTIONS (preflight)
//! - **Allowed Headers**: Content-Type
//! - **Max Age**: 3600 seconds for preflight caching
//!
//! Webhooks are server-to-server and unaffected by CORS.

use std::time::Duration;

use http::{header::HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

/// Allowed request headers
pub const ALLOWED_HEADERS: [http::header::HeaderName; 1] = [http::header::CONTENT_TYPE];

/// Allowed methods
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Preflight cache lifetime
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// CORS layer for `allowed_origins`, or loopback-only when the list is empty
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allowed: Vec<String> = allowed_origins
        .iter()
        .map(|o| normalize_origin(o))
        .collect();

    let policy = if allowed.is_empty() {
        AllowOrigin::predicate(|origin, _| is_localhost_origin(origin))
    } else {
        AllowOrigin::predicate(move |origin, _| is_listed_origin(origin, &allowed))
    };

    CorsLayer::new()
        .allow_origin(policy)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .max_age(Duration::from_secs(DEFAULT_MAX_AGE_SECS))
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// Origin matches one of `allowed` (already normalized)
pub fn is_listed_origin(origin: &HeaderValue, allowed: &[String]) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let origin = normalize_origin(origin);
    allowed.iter().any(|a| *a == origin)
}

/// Origin is `http(s)://localhost`, `127.0.0.1` or `[::1]`, with an optional
/// non-zero port
pub fn is_localhost_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let Ok(url) = Url::parse(origin) else {
        return false;
    };

    matches!(url.scheme(), "http" | "https")
        && matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
        && url.port() != Some(0)
        && url.username().is_empty()
}
