// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The background task behind every [`TaskScope`].
//!
//! [`TaskScope`]: crate::TaskScope

use crate::{CancelToken, Continuation, DrainOnCancel, Job, JobQueue, ScopeContext};
use std::{sync::Arc, time::Duration};
use tokio::{runtime::Handle,
            task::{JoinError, JoinSet}};
use tracing::Instrument;

/// Owns the children of one scope. Lives inside the spawned background task.
pub(super) struct ScopeWorker {
    pub context: ScopeContext,
    pub job_queue: Arc<JobQueue>,
    pub drain_on_cancel: DrainOnCancel,
    pub cancel_grace_period: Duration,
    pub runtime_handle: Handle,
    pub children: JoinSet<miette::Result<()>>,
}

/// Releases [`TaskScope::await_shutdown()`] however the background task ends,
/// including when it is aborted by runtime shutdown.
///
/// [`TaskScope::await_shutdown()`]: crate::TaskScope::await_shutdown
pub(super) struct ShutdownLatchGuard {
    pub shutdown_latch: CancelToken,
}

impl Drop for ShutdownLatchGuard {
    fn drop(&mut self) { self.shutdown_latch.cancel(); }
}

impl ScopeWorker {
    pub async fn run(mut self, shutdown_latch_guard: ShutdownLatchGuard) {
        tracing::debug!(message = "scope started");

        // Jobs launched before this task got scheduled. If the scope was cancelled in
        // the meantime they are left for the drain policy in `shutdown()`.
        if !self.context.is_cancelled() {
            for job in self.job_queue.drain_buffered() {
                self.spawn_child(job);
            }
            while self.intake_once().await == Continuation::Continue {}
        }

        self.shutdown().await;

        tracing::debug!(message = "scope finished");
        drop(shutdown_latch_guard);
    }

    /// Waits for either the next job (which is then spawned) or the next child to
    /// finish (which is then logged).
    async fn intake_once(&mut self) -> Continuation {
        let cancel_token = self.context.cancel_token().clone();
        if cancel_token.is_cancelled() {
            return Continuation::Stop;
        }

        tokio::select! {
            maybe_job = self.job_queue.next(&cancel_token) => match maybe_job {
                Some(job) => {
                    self.spawn_child(job);
                    Continuation::Continue
                }
                None => Continuation::Stop,
            },
            Some(result) = self.children.join_next(), if !self.children.is_empty() => {
                log_child_result(result);
                Continuation::Continue
            }
        }
    }

    fn spawn_child(&mut self, job: Job) {
        let span = tracing::debug_span!(
            "scope_job",
            scope_id = %self.context.scope_id(),
            priority = ?self.context.priority(),
        );
        let fut = job.run(self.context.clone()).instrument(span);
        self.children.spawn_on(fut, &self.runtime_handle);
    }

    /// Stops intake, applies the drain policy, then gives the children the grace
    /// period before aborting whatever is left.
    async fn shutdown(&mut self) {
        self.job_queue.close();

        let buffered = self.job_queue.drain_buffered();
        if !buffered.is_empty() {
            match self.drain_on_cancel {
                DrainOnCancel::RunBuffered => {
                    tracing::debug!(
                        message = "starting jobs buffered at cancellation",
                        count = buffered.len()
                    );
                    for job in buffered {
                        self.spawn_child(job);
                    }
                }
                DrainOnCancel::DiscardBuffered => {
                    tracing::debug!(
                        message = "discarding jobs buffered at cancellation",
                        count = buffered.len()
                    );
                    drop(buffered);
                }
            }
        }

        let children = &mut self.children;
        let joined_in_time = tokio::time::timeout(self.cancel_grace_period, async {
            while let Some(result) = children.join_next().await {
                log_child_result(result);
            }
        })
        .await
        .is_ok();

        if !joined_in_time {
            tracing::debug!(
                message = "grace period elapsed, aborting jobs",
                count = self.children.len(),
                grace_period = ?self.cancel_grace_period
            );
            self.children.abort_all();
            while let Some(result) = self.children.join_next().await {
                log_child_result(result);
            }
        }
    }
}

/// Job failures and panics stay inside the scope. They are logged and dropped.
fn log_child_result(result: Result<miette::Result<()>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(report)) => {
            tracing::warn!(message = "job failed", error = ?report);
        }
        Err(join_error) if join_error.is_panic() => {
            tracing::warn!(message = "job panicked", error = %join_error);
        }
        Err(join_error) => {
            tracing::trace!(message = "job aborted", error = %join_error);
        }
    }
}
