//! Duplicate webhook suppression
//!
//! Gateways re-deliver webhooks. [`DuplicateSuppressor`] remembers every
//! identifier it has accepted and rejects repeats until the next clearing
//! boundary, at which point the whole set is dropped at once. Boundaries sit
//! at fixed multiples of the window measured from construction, so the set is
//! cleared on a wall-clock cadence and entries never carry their own TTL.
//!
//! ```text
//! t0          t0+W        t0+2W
//! |---- A ----|--- A -----|
//!   accept      accept again (set was cleared at t0+W)
//! ```
//!
//! Nothing survives a restart; this is a best-effort guard, not idempotency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// Time-windowed set of processed event identifiers
pub struct DuplicateSuppressor {
    window: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<WindowState>,
}

struct WindowState {
    /// Start of the current clearing window
    started: Instant,
    /// Identifier -> instant it was accepted
    seen: HashMap<String, Instant>,
}

impl WindowState {
    /// Clear the set if one or more boundaries have passed since `started`.
    fn roll(&mut self, now: Instant, window: Duration) {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < window {
            return;
        }
        let into_window = elapsed.as_nanos() % window.as_nanos().max(1);
        self.started = now - Duration::from_nanos(into_window as u64);
        if !self.seen.is_empty() {
            debug!(cleared = self.seen.len(), "Duplicate suppression window rolled over");
        }
        self.seen.clear();
    }
}

impl DuplicateSuppressor {
    /// Suppressor on the system clock
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    /// Suppressor on an injected clock
    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            window,
            clock,
            state: Mutex::new(WindowState {
                started,
                seen: HashMap::new(),
            }),
        }
    }

    /// Returns `true` and records `event_id` if it has not been seen in the
    /// current window, `false` otherwise.
    pub fn should_process(&self, event_id: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.roll(now, self.window);

        if state.seen.contains_key(event_id) {
            return false;
        }
        state.seen.insert(event_id.to_string(), now);
        true
    }

    /// Forget `event_id` so a later delivery is processed again.
    ///
    /// Returns whether it was present.
    pub fn release(&self, event_id: &str) -> bool {
        self.state.lock().seen.remove(event_id).is_some()
    }

    /// Whether `event_id` is in the current window
    pub fn contains(&self, event_id: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.roll(now, self.window);
        state.seen.contains_key(event_id)
    }

    /// Number of identifiers in the current window
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.roll(now, self.window);
        state.seen.len()
    }

    /// Whether the current window is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every identifier immediately
    pub fn clear(&self) {
        self.state.lock().seen.clear();
    }

    /// Clearing interval
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl std::fmt::Debug for DuplicateSuppressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateSuppressor")
            .field("window", &self.window)
            .field("entries", &self.state.lock().seen.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn suppressor(window_secs: u64) -> (DuplicateSuppressor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let dedup = DuplicateSuppressor::with_clock(Duration::from_secs(window_secs), clock.clone());
        (dedup, clock)
    }

    #[test]
    fn test_second_delivery_suppressed() {
        let (dedup, _clock) = suppressor(60);
        assert!(dedup.should_process("tr_123"));
        assert!(!dedup.should_process("tr_123"));
        assert!(!dedup.should_process("tr_123"));
        assert!(dedup.should_process("tr_456"));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_window_clears_whole_set() {
        let (dedup, clock) = suppressor(60);
        assert!(dedup.should_process("tr_a"));
        clock.advance(Duration::from_secs(59));
        assert!(dedup.should_process("tr_b"));

        // Boundary reached: both go, even though tr_b is only 1s old.
        clock.advance(Duration::from_secs(1));
        assert!(dedup.should_process("tr_a"));
        assert!(dedup.should_process("tr_b"));
    }

    #[test]
    fn test_boundaries_stay_anchored() {
        let (dedup, clock) = suppressor(60);
        clock.advance(Duration::from_secs(150));
        // Window now runs 120..180.
        assert!(dedup.should_process("tr_a"));
        clock.advance(Duration::from_secs(29));
        assert!(!dedup.should_process("tr_a"));
        clock.advance(Duration::from_secs(1));
        assert!(dedup.should_process("tr_a"));
    }

    #[test]
    fn test_release_allows_retry() {
        let (dedup, _clock) = suppressor(60);
        assert!(dedup.should_process("tr_retry"));
        assert!(dedup.release("tr_retry"));
        assert!(!dedup.release("tr_retry"));
        assert!(dedup.should_process("tr_retry"));
    }

    #[test]
    fn test_clear() {
        let (dedup, _clock) = suppressor(60);
        dedup.should_process("tr_a");
        assert!(dedup.contains("tr_a"));
        dedup.clear();
        assert!(dedup.is_empty());
        assert!(dedup.should_process("tr_a"));
    }

    #[test]
    fn test_concurrent_insertion_accepts_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::thread;

        let dedup = Arc::new(DuplicateSuppressor::new(Duration::from_secs(60)));
        let accepted = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..8 {
            let dedup = Arc::clone(&dedup);
            let accepted = Arc::clone(&accepted);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    if dedup.should_process(&format!("tr_{i}")) {
                        accepted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(accepted.load(Ordering::Relaxed), 100);
    }
}
