//! Status and health check handlers.
//!
//! - `/health` - liveness, always `{"status": "healthy"}`
//! - `/ready` - readiness, 503 once shutdown has begun
//! - `/status` - webhook counters, pending follow-ups and latency
//!
//! # Architecture
//!
//! ```text
//! HTTP Request ──> Axum Router ──> status_handler ──> AppContext
//!                                        │               │
//!                                        ▼               ▼
//!                              StatusResponse     ServiceStats
//!                                        │      + LatencyHistogram
//!                                        ▼
//!                                   JSON Response
//! ```
//!
//! # Example Response
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "name": "paywatch",
//!   "uptime_seconds": 3600,
//!   "webhooks_received": 120,
//!   "duplicates_suppressed": 14,
//!   "notifications_sent": 101,
//!   "notifications_failed": 2,
//!   "follow_ups_scheduled": 9,
//!   "follow_ups_pending": 1,
//!   "errors": 3,
//!   "dedup_entries": {"mollie": 4, "razorpay": 0},
//!   "latency": {"p50_ms": 41.2, "p95_ms": 180.3, "p99_ms": 402.0, ...},
//!   "status": "running",
//!   "timestamp": "2026-10-16T12:00:00+00:00"
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::app::AppContext;

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

// ============================================================================
// Response Types
// ============================================================================

/// Health check response for liveness checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`, or `shutting-down` from `/ready` during shutdown
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Entries currently held by each duplicate suppressor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupEntries {
    /// Mollie payment ids
    pub mollie: usize,
    /// Razorpay event ids
    pub razorpay: usize,
}

/// Detailed service status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server version (from Cargo.toml)
    pub version: String,

    /// Server name
    pub name: String,

    /// Server uptime in seconds
    pub uptime_seconds: u64,

    /// Webhook deliveries received from either gateway
    pub webhooks_received: u64,

    /// Deliveries dropped as duplicates
    pub duplicates_suppressed: u64,

    /// Alerts the notifier accepted
    pub notifications_sent: u64,

    /// Alerts that failed to deliver
    pub notifications_failed: u64,

    /// Deferred subscription creations scheduled
    pub follow_ups_scheduled: u64,

    /// Deferred subscription creations still waiting
    pub follow_ups_pending: usize,

    /// Requests that ended in a server error
    pub errors: u64,

    /// Suppressor sizes
    pub dedup_entries: DedupEntries,

    /// Webhook handling latency
    pub latency: LatencyMetrics,

    /// Server status (always "running" if responding)
    pub status: String,

    /// RFC 3339 timestamp of when status was generated
    pub timestamp: String,
}

/// Request latency percentile metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    /// 50th percentile (median) latency in milliseconds
    pub p50_ms: f64,

    /// 95th percentile latency in milliseconds
    pub p95_ms: f64,

    /// 99th percentile latency in milliseconds
    pub p99_ms: f64,

    /// Total number of requests recorded
    pub total_requests: u64,

    /// Mean latency in milliseconds
    pub mean_ms: f64,

    /// Maximum latency recorded in milliseconds
    pub max_ms: f64,
}

// ============================================================================
// Latency Histogram
// ============================================================================

/// Thread-safe latency histogram.
///
/// Tracks 1 microsecond to 60 seconds with 3 significant figures.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: RwLock<Histogram<u64>>,
}

impl LatencyHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, 60_000_000, 3)
            .expect("constant histogram bounds are valid");
        Self {
            inner: RwLock::new(histogram),
        }
    }

    /// Record a latency in microseconds; out-of-range values are ignored
    pub fn record(&self, latency_us: u64) {
        let _ = self.inner.write().record(latency_us);
    }

    /// Record a latency duration
    pub fn record_duration(&self, duration: Duration) {
        self.record(duration.as_micros() as u64);
    }

    /// Number of recorded values
    pub fn count(&self) -> u64 {
        self.inner.read().len()
    }

    /// Percentiles in milliseconds
    pub fn metrics(&self) -> LatencyMetrics {
        let hist = self.inner.read();
        LatencyMetrics {
            p50_ms: hist.value_at_percentile(50.0) as f64 / 1000.0,
            p95_ms: hist.value_at_percentile(95.0) as f64 / 1000.0,
            p99_ms: hist.value_at_percentile(99.0) as f64 / 1000.0,
            total_requests: hist.len(),
            mean_ms: hist.mean() / 1000.0,
            max_ms: hist.max() as f64 / 1000.0,
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Service Counters
// ============================================================================

/// Process-lifetime counters behind `/status`.
///
/// All counters are relaxed atomics; the histogram sits behind an `RwLock`.
#[derive(Debug)]
pub struct ServiceStats {
    start_time: Instant,
    webhooks_received: AtomicU64,
    duplicates_suppressed: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
    follow_ups_scheduled: AtomicU64,
    error_count: AtomicU64,
    latency_histogram: LatencyHistogram,
}

impl ServiceStats {
    /// Fresh counters; uptime starts now
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            webhooks_received: AtomicU64::new(0),
            duplicates_suppressed: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            follow_ups_scheduled: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            latency_histogram: LatencyHistogram::new(),
        }
    }

    /// Uptime in seconds
    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Count a webhook delivery
    #[inline]
    pub fn record_webhook(&self) -> u64 {
        self.webhooks_received.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Webhook deliveries so far
    #[inline]
    pub fn webhooks_received(&self) -> u64 {
        self.webhooks_received.load(Ordering::Relaxed)
    }

    /// Count a suppressed duplicate
    #[inline]
    pub fn record_duplicate(&self) -> u64 {
        self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Duplicates suppressed so far
    #[inline]
    pub fn duplicates_suppressed(&self) -> u64 {
        self.duplicates_suppressed.load(Ordering::Relaxed)
    }

    /// Count an alert by outcome
    #[inline]
    pub fn record_notification(&self, delivered: bool) {
        let counter = if delivered {
            &self.notifications_sent
        } else {
            &self.notifications_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Alerts delivered so far
    #[inline]
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    /// Alerts failed so far
    #[inline]
    pub fn notifications_failed(&self) -> u64 {
        self.notifications_failed.load(Ordering::Relaxed)
    }

    /// Count a scheduled follow-up
    #[inline]
    pub fn record_follow_up(&self) -> u64 {
        self.follow_ups_scheduled.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Follow-ups scheduled so far
    #[inline]
    pub fn follow_ups_scheduled(&self) -> u64 {
        self.follow_ups_scheduled.load(Ordering::Relaxed)
    }

    /// Count a server error
    #[inline]
    pub fn record_error(&self) -> u64 {
        self.error_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Server errors so far
    #[inline]
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Record webhook handling time
    #[inline]
    pub fn record_latency(&self, duration: Duration) {
        self.latency_histogram.record_duration(duration);
    }

    /// Latency percentiles
    #[inline]
    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency_histogram.metrics()
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// `GET /health`
#[instrument(skip_all)]
pub async fn health_handler() -> impl IntoResponse {
    debug!("Health check requested");
    (StatusCode::OK, Json(HealthResponse::default()))
}

/// `GET /status`
#[instrument(skip_all)]
pub async fn status_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    debug!("Status check requested");

    let stats = &ctx.stats;
    let response = StatusResponse {
        version: SERVER_VERSION.to_string(),
        name: SERVER_NAME.to_string(),
        uptime_seconds: stats.uptime_seconds(),
        webhooks_received: stats.webhooks_received(),
        duplicates_suppressed: stats.duplicates_suppressed(),
        notifications_sent: stats.notifications_sent(),
        notifications_failed: stats.notifications_failed(),
        follow_ups_scheduled: stats.follow_ups_scheduled(),
        follow_ups_pending: ctx.scheduler.pending_count(),
        errors: stats.error_count(),
        dedup_entries: DedupEntries {
            mollie: ctx.mollie_dedup.len(),
            razorpay: ctx.razorpay_dedup.len(),
        },
        latency: stats.latency_metrics(),
        status: "running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

/// `GET /ready`: 503 once the scheduler has been shut down
#[instrument(skip_all)]
pub async fn readiness_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    debug!("Readiness check requested");
    if ctx.scheduler.is_shut_down() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "shutting-down".to_string(),
            }),
        );
    }
    (StatusCode::OK, Json(HealthResponse::default()))
}

// ============================================================================
// Router Setup
// ============================================================================

/// Health and status routes, merged into the main router
pub fn status_router() -> axum::Router<Arc<AppContext>> {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/ready", get(readiness_handler))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_default() {
        assert_eq!(HealthResponse::default().status, "healthy");
    }

    #[test]
    fn test_stats_counters() {
        let stats = ServiceStats::new();
        assert_eq!(stats.record_webhook(), 1);
        assert_eq!(stats.record_webhook(), 2);
        assert_eq!(stats.record_duplicate(), 1);
        stats.record_notification(true);
        stats.record_notification(true);
        stats.record_notification(false);
        assert_eq!(stats.record_follow_up(), 1);
        assert_eq!(stats.record_error(), 1);

        assert_eq!(stats.webhooks_received(), 2);
        assert_eq!(stats.duplicates_suppressed(), 1);
        assert_eq!(stats.notifications_sent(), 2);
        assert_eq!(stats.notifications_failed(), 1);
        assert_eq!(stats.follow_ups_scheduled(), 1);
        assert_eq!(stats.error_count(), 1);
        assert!(stats.uptime_seconds() < 1);
    }

    #[test]
    fn test_latency_histogram() {
        let histogram = LatencyHistogram::new();

        histogram.record(1000); // 1ms
        histogram.record(2000);
        histogram.record(5000);
        histogram.record(10000);
        histogram.record(50000); // 50ms

        assert_eq!(histogram.count(), 5);
        let metrics = histogram.metrics();
        assert!(metrics.p50_ms > 0.0);
        assert!(metrics.p95_ms >= metrics.p50_ms);
        assert!(metrics.p99_ms >= metrics.p95_ms);
        // bucketing loses a little precision at the top
        assert!((50.0..=51.0).contains(&metrics.max_ms), "max {}", metrics.max_ms);
    }

    #[test]
    fn test_latency_out_of_range_ignored() {
        let histogram = LatencyHistogram::new();
        histogram.record_duration(Duration::from_secs(120));
        assert_eq!(histogram.count(), 0);
    }

    #[test]
    fn test_status_response_serialization() {
        let response = StatusResponse {
            version: "0.1.0".to_string(),
            name: "paywatch".to_string(),
            uptime_seconds: 3600,
            webhooks_received: 10,
            duplicates_suppressed: 2,
            notifications_sent: 8,
            notifications_failed: 0,
            follow_ups_scheduled: 1,
            follow_ups_pending: 0,
            errors: 0,
            dedup_entries: DedupEntries::default(),
            latency: LatencyMetrics::default(),
            status: "running".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"webhooks_received\":10"));
        assert!(json.contains("\"dedup_entries\":{\"mollie\":0,\"razorpay\":0}"));
        assert!(json.contains("\"status\":\"running\""));
    }

    #[test]
    fn test_server_constants() {
        assert_eq!(SERVER_NAME, "paywatch");
        assert!(!SERVER_VERSION.is_empty());
    }

    #[test]
    fn test_stats_thread_safety() {
        use std::thread;

        let stats = Arc::new(ServiceStats::new());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_webhook();
                        stats.record_latency(Duration::from_micros(500));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(stats.webhooks_received(), 10_000);
        assert_eq!(stats.latency_metrics().total_requests, 10_000);
    }
}
