//! Deferred follow-up tasks
//!
//! After an initial mandate payment the gateway needs a few seconds before a
//! subscription can be created against the new mandate. Rather than holding the
//! webhook request open, the orchestrator hands the work to
//! [`FollowUpScheduler`], which runs it on its own tokio task after the delay.
//!
//! - At most one pending task per key (payment identifier).
//! - While still waiting, a task is dropped on [`FollowUpScheduler::shutdown`].
//! - Once the delay has elapsed the task runs to completion.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type PendingMap = HashMap<String, (u64, JoinHandle<()>)>;

/// Runs keyed tasks after a fixed delay
pub struct FollowUpScheduler {
    pending: Arc<Mutex<PendingMap>>,
    next_ticket: AtomicU64,
    shutdown_tx: watch::Sender<bool>,
}

impl FollowUpScheduler {
    /// Create an idle scheduler
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
            shutdown_tx,
        }
    }

    /// Run `task` after `delay` unless a task for `key` is already pending.
    ///
    /// Returns `false` when the key was already scheduled or the scheduler is
    /// shutting down. Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        if *self.shutdown_tx.borrow() {
            warn!(key = %key, "Scheduler is shutting down; follow-up not scheduled");
            return false;
        }

        // Held across spawn so the task cannot deregister before it is registered.
        let mut pending = self.pending.lock();
        if pending.contains_key(&key) {
            debug!(key = %key, "Follow-up already pending");
            return false;
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let registry = Arc::clone(&self.pending);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let cancelled = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = shutdown_rx.wait_for(|stopping| *stopping) => true,
            };

            if cancelled {
                warn!(key = %task_key, "Follow-up cancelled by shutdown before it ran");
            } else {
                task.await;
            }

            let mut pending = registry.lock();
            if matches!(pending.get(&task_key), Some((t, _)) if *t == ticket) {
                pending.remove(&task_key);
            }
        });

        pending.insert(key.clone(), (ticket, handle));
        debug!(key = %key, delay_ms = delay.as_millis() as u64, "Follow-up scheduled");
        true
    }

    /// Whether a task for `key` has not finished yet
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }

    /// Number of unfinished tasks
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Cancel every task still inside its delay. Later `schedule` calls are refused.
    pub fn shutdown(&self) {
        let waiting = self.pending_count();
        self.shutdown_tx.send_replace(true);
        info!(waiting, "Follow-up scheduler shutting down");
    }

    /// Wait until every task scheduled so far has finished.
    pub async fn drain(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut pending = self.pending.lock();
                pending.drain().map(|(_, (_, handle))| handle).collect()
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Follow-up task panicked");
                }
            }
        }
    }
}

impl Default for FollowUpScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FollowUpScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowUpScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}
