// src/concurrency/context.rs
//
// Run-scoped cancellation plus first-error-wins failure recording.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::StorageError;

/// Holds at most one error for a whole run; the first writer wins.
#[derive(Debug, Default)]
pub struct FirstFailure {
    first: Mutex<Option<StorageError>>,
    discarded: AtomicUsize,
}

impl FirstFailure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `err` unless an error is already held. Returns true if it was kept.
    pub fn record(&self, err: StorageError) -> bool {
        let mut slot = self.first.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            debug!("discarding follow-up failure: {}", err);
            return false;
        }
        *slot = Some(err);
        true
    }

    pub fn is_set(&self) -> bool {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Remove and return the recorded error.
    pub fn take(&self) -> Option<StorageError> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Number of errors dropped because one was already recorded.
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::Relaxed)
    }
}

/// Shared context for one bounded run.
///
/// Cloning is cheap; all clones observe the same cancellation and failure slot.
/// Cancellation is cooperative: it stops new work from being admitted but does
/// not abort requests already on the wire.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    token: CancellationToken,
    failure: Arc<FirstFailure>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and cancel the run.
    ///
    /// `Cancelled` errors are a consequence of an earlier failure and are never
    /// recorded themselves. Returns true if `err` became the run's failure.
    pub fn fail(&self, err: StorageError) -> bool {
        let kept = if err.is_cancelled() {
            false
        } else {
            self.failure.record(err)
        };
        self.token.cancel();
        kept
    }

    /// Cancel without recording anything.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the run is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_set()
    }

    pub fn take_failure(&self) -> Option<StorageError> {
        self.failure.take()
    }

    pub fn discarded_failures(&self) -> usize {
        self.failure.discarded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn backend(msg: &str) -> StorageError {
        StorageError::Backend(anyhow::anyhow!(msg.to_string()))
    }

    #[test]
    fn test_first_failure_wins() {
        let slot = FirstFailure::new();
        assert!(slot.record(backend("first")));
        assert!(!slot.record(backend("second")));
        assert!(!slot.record(backend("third")));
        assert_eq!(slot.discarded(), 2);
        assert_eq!(slot.take().unwrap().to_string(), "first");
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_fail_cancels_and_keeps_first() {
        let ctx = RunContext::new();
        let clone = ctx.clone();
        assert!(!ctx.is_cancelled());

        assert!(clone.fail(backend("boom")));
        assert!(ctx.is_cancelled());
        assert!(!ctx.fail(backend("later")));
        assert_eq!(ctx.take_failure().unwrap().to_string(), "boom");
    }

    #[test]
    fn test_cancelled_error_is_not_recorded() {
        let ctx = RunContext::new();
        assert!(!ctx.fail(StorageError::Cancelled));
        assert!(ctx.is_cancelled());
        assert!(!ctx.has_failed());
        assert_eq!(ctx.discarded_failures(), 0);
    }

    #[test]
    fn test_concurrent_records_keep_exactly_one() {
        let ctx = RunContext::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let ctx = ctx.clone();
                std::thread::spawn(move || ctx.fail(backend(&format!("err {i}"))))
            })
            .collect();
        let kept = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|kept| *kept)
            .count();
        assert_eq!(kept, 1);
        assert_eq!(ctx.discarded_failures(), 15);
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let ctx = RunContext::new();
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.cancelled().await })
        };
        ctx.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after cancel")
            .unwrap();
        assert!(!ctx.has_failed());
    }
}
