// src/concurrency/group.rs
//
// Join barrier for fallible tasks spawned under one run context.

use std::future::Future;

use anyhow::anyhow;
use tokio::task::{JoinError, JoinSet};
use tracing::warn;

use super::context::RunContext;
use crate::error::StorageError;

/// Spawns tasks that report failure into a shared [`RunContext`] and waits
/// for all of them on [`drain`](TaskGroup::drain).
///
/// Finished tasks are reaped on every `spawn`, so the set only ever holds
/// tasks that are still running (bounded by whatever admission gate the
/// caller uses).
#[derive(Debug)]
pub struct TaskGroup {
    tasks: JoinSet<()>,
    ctx: RunContext,
    spawned: usize,
}

impl TaskGroup {
    pub fn new(ctx: RunContext) -> Self {
        Self {
            tasks: JoinSet::new(),
            ctx,
            spawned: 0,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Spawn `fut`; an `Err` it returns is recorded and cancels the run.
    pub fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        while let Some(done) = self.tasks.try_join_next() {
            self.settle(done);
        }

        let ctx = self.ctx.clone();
        self.tasks.spawn(async move {
            if let Err(err) = fut.await {
                ctx.fail(err);
            }
        });
        self.spawned += 1;
    }

    /// Tasks not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Total tasks spawned over the group's lifetime.
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Wait until every spawned task has finished.
    pub async fn drain(&mut self) {
        while let Some(done) = self.tasks.join_next().await {
            self.settle(done);
        }
    }

    fn settle(&self, done: Result<(), JoinError>) {
        if let Err(join_err) = done {
            warn!("task did not complete: {}", join_err);
            self.ctx
                .fail(StorageError::Backend(anyhow!("task did not complete: {join_err}")));
        }
    }
}
