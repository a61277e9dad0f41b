// src/concurrency/gate.rs
//
// Fixed-size admission gate: a counting semaphore whose acquisition is tied
// to the run context, so waiting for a slot never outlives a cancelled run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::context::RunContext;
use crate::error::StorageError;

#[derive(Debug, Default)]
struct GateMetrics {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    admitted: AtomicUsize,
}

/// Worker budget of `capacity` slots shared by every task of one run.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    metrics: Arc<GateMetrics>,
}

impl AdmissionGate {
    /// Capacity is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            metrics: Arc::new(GateMetrics::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.metrics.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of permits ever held at once.
    pub fn peak_in_flight(&self) -> usize {
        self.metrics.peak.load(Ordering::Acquire)
    }

    /// Total permits handed out.
    pub fn admitted(&self) -> usize {
        self.metrics.admitted.load(Ordering::Acquire)
    }

    /// Wait for a free slot.
    ///
    /// Fails with [`StorageError::Cancelled`] as soon as `ctx` is cancelled,
    /// whether the cancellation happened before or during the wait.
    pub async fn acquire(&self, ctx: &RunContext) -> Result<AdmissionPermit, StorageError> {
        if ctx.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let permit = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(StorageError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|_| StorageError::Cancelled)?
            }
        };

        let now = self.metrics.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.metrics.peak.fetch_max(now, Ordering::AcqRel);
        self.metrics.admitted.fetch_add(1, Ordering::AcqRel);

        Ok(AdmissionPermit {
            _permit: permit,
            metrics: Arc::clone(&self.metrics),
        })
    }
}

/// One unit of the worker budget; released when dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    metrics: Arc<GateMetrics>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
