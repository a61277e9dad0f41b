// src/delete.rs
//
// Object deletion: single objects, and every object under a prefix with a
// bounded number of deletes in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::concurrency::{AdmissionGate, RunContext, TaskGroup};
use crate::error::{StorageError, StorageResult};
use crate::object_store::{DynObjectStore, ObjectKey, ObjectStore};
use crate::uri::ObjectLocator;

/// Outcome of a successful recursive delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteStats {
    /// Objects removed by this run.
    pub deleted: u64,
    /// Objects listed but already gone when their delete was issued.
    pub absent: u64,
}

#[derive(Debug, Default)]
struct DeleteCounters {
    deleted: AtomicU64,
    absent: AtomicU64,
}

impl DeleteCounters {
    fn snapshot(&self) -> DeleteStats {
        DeleteStats {
            deleted: self.deleted.load(Ordering::Relaxed),
            absent: self.absent.load(Ordering::Relaxed),
        }
    }
}

/// Delete one object. A missing object counts as success.
///
/// Returns whether the object existed.
pub async fn delete_object(store: &dyn ObjectStore, locator: &ObjectLocator) -> StorageResult<bool> {
    if locator.is_bucket_root() {
        return Err(StorageError::InvalidArgument(format!(
            "{locator} names a bucket, not an object (use -r to delete everything under it)"
        )));
    }

    match store.delete(locator.bucket(), locator.path()).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => {
            debug!("{} already absent", locator);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Deletes everything under a prefix with at most `jobs` deletes in flight.
///
/// Listing is sequential; every listed key waits for a slot in the worker
/// budget and is then deleted on its own task. The first failure (listing or
/// delete) is kept, stops further dispatch, and is returned once every
/// dispatched task has finished. Only pass/fail is reported on error: which
/// keys were removed before the failure is not tracked.
pub struct PrefixDeleter {
    store: DynObjectStore,
    jobs: usize,
}

impl PrefixDeleter {
    pub fn new(store: DynObjectStore, jobs: usize) -> Self {
        Self {
            store,
            jobs: jobs.max(1),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub async fn run(&self, bucket: &str, prefix: &str) -> StorageResult<DeleteStats> {
        self.run_with(bucket, prefix, RunContext::new(), AdmissionGate::new(self.jobs))
            .await
    }

    /// Same as [`run`](Self::run) with a caller-supplied context and gate, so
    /// the run can be cancelled from outside or its admission observed.
    pub async fn run_with(
        &self,
        bucket: &str,
        prefix: &str,
        ctx: RunContext,
        gate: AdmissionGate,
    ) -> StorageResult<DeleteStats> {
        info!(
            "Deleting objects under gs://{}/{} with up to {} concurrent deletes",
            bucket,
            prefix,
            gate.capacity()
        );

        let counters = Arc::new(DeleteCounters::default());
        let mut group = TaskGroup::new(ctx.clone());
        let mut listing = self.store.list(bucket, prefix);

        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                item = listing.next() => item,
            };

            let key = match next {
                None => break,
                Some(Ok(meta)) => ObjectKey {
                    bucket: bucket.to_string(),
                    name: meta.name,
                },
                Some(Err(err)) => {
                    warn!("listing gs://{}/{} failed: {}", bucket, prefix, err);
                    ctx.fail(err);
                    break;
                }
            };

            // Only fails once the run is cancelled.
            let Ok(permit) = gate.acquire(&ctx).await else {
                break;
            };

            let store = Arc::clone(&self.store);
            let counters = Arc::clone(&counters);
            let task_ctx = ctx.clone();
            group.spawn(async move {
                if task_ctx.is_cancelled() {
                    debug!("skipping {} after cancellation", key);
                    return Ok(());
                }
                match store.delete(&key.bucket, &key.name).await {
                    Ok(()) => {
                        debug!("Deleted: {}", key);
                        counters.deleted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) if e.is_not_found() => {
                        debug!("{} already absent", key);
                        counters.absent.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!("delete of {} failed: {}", key, e);
                        // Recorded while the slot is still held, so the lister
                        // cannot admit another key past this failure.
                        task_ctx.fail(e);
                    }
                }
                drop(permit);
                Ok(())
            });
        }

        drop(listing);
        group.drain().await;

        if let Some(err) = ctx.take_failure() {
            return Err(err);
        }
        if ctx.is_cancelled() {
            // Cancelled from outside without a recorded failure.
            return Err(StorageError::Cancelled);
        }

        let stats = counters.snapshot();
        info!(
            "Deleted {} objects under gs://{}/{} ({} already absent, {} dispatched)",
            stats.deleted,
            bucket,
            prefix,
            stats.absent,
            group.spawned()
        );
        Ok(stats)
    }
}
