//! Cooperative cancellation
//!
//! `Shutdown` is the signal handed to a `Broker` at construction. It carries
//! two one-way flags: `cancelled`, raised by whoever owns the broker, and
//! `completed`, raised by the dispatch loop once it has exited. Both are
//! `tokio::sync::watch` channels so any number of tasks can wait on them
//! without polling.

use tokio::sync::watch;

#[derive(Debug)]
pub struct Shutdown {
    cancelled: watch::Sender<bool>,
    completed: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (cancelled, _) = watch::channel(false);
        let (completed, _) = watch::channel(false);
        Self {
            cancelled,
            completed,
        }
    }

    /// Raise the cancellation flag. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolve once `cancel` has been called. Returns immediately if it already was.
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        // The sender lives in `self`, so `wait_for` can only fail if we are gone.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    pub(crate) fn mark_completed(&self) {
        self.completed.send_replace(true);
    }

    pub fn is_completed(&self) -> bool {
        *self.completed.borrow()
    }

    /// Resolve once the dispatch loop has exited.
    pub async fn completed(&self) {
        let mut rx = self.completed.subscribe();
        let _ = rx.wait_for(|completed| *completed).await;
    }
}
