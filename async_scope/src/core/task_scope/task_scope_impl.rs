// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::scope_worker::{ScopeWorker, ShutdownLatchGuard};
use crate::{CancelToken, Job, JobQueue, ScopeConfig, ScopeContext, ScopeError, ScopeId,
            ScopeLineage};
use std::{fmt::{Debug, Formatter, Result as FmtResult},
          hash::{Hash, Hasher},
          sync::Arc};
use tokio::{runtime::Handle, task::JoinSet};
use tracing::Instrument;

/// A lifetime boundary for async jobs. Unrelated code [`launch()`]es jobs into it; the
/// scope runs each one as its own Tokio task and cancels all of them together.
///
/// # Architecture
///
/// ```text
///  launch(job) ──┐
///  launch(job) ──┼──▶ JobQueue ──▶ background task ──spawn──▶ child job tasks
///  launch(job) ──┘   (FIFO, MPSC)   (one per scope)            (JoinSet)
///                                         ▲
///  cancel() ──── CancelToken ─────────────┴────────────────▶ ScopeContext of
///                                                           every child
/// ```
///
/// The background task is started by [`try_new()`]. It:
///
/// 1. Starts any jobs that were launched before it got scheduled.
/// 2. Loops, taking jobs from the [`JobQueue`] in order and spawning each one with a
///    clone of the scope's [`ScopeContext`] (priority, locals, cancellation). Finished
///    children are reaped as it goes, logging failures and panics.
/// 3. Once cancelled, closes the queue and applies the [`DrainOnCancel`] policy to jobs
///    that were accepted but never started. Running children then get the configured
///    grace period to observe cancellation, after which they are aborted.
///
/// # Cancellation
///
/// [`cancel()`] is idempotent, never suspends, and can be called from any context
/// (including [`Drop`]). [`is_cancelled()`] never goes back to `false`. A
/// [`ScopeLineage::Structured`] scope is also cancelled when its parent token is.
///
/// Cancellation is cooperative: jobs are expected to watch
/// [`ScopeContext::cancelled()`]. The abort after the grace period is the only forced
/// stop.
///
/// # Failures
///
/// A job's `Err` or panic is logged and dropped. It never affects the scope or the
/// other jobs. Use your own channel if you need the outcome.
///
/// # Identity
///
/// Handles are cheap to clone. Two handles are equal iff they refer to the same scope
/// (same [`ScopeId`]).
///
/// Dropping every handle does **not** cancel the scope. Wrap it in a [`ScopeOwner`] to
/// tie its lifetime to an owner.
///
/// [`DrainOnCancel`]: crate::DrainOnCancel
/// [`ScopeOwner`]: crate::ScopeOwner
/// [`cancel()`]: Self::cancel
/// [`is_cancelled()`]: Self::is_cancelled
/// [`launch()`]: Self::launch
/// [`try_new()`]: Self::try_new
#[derive(Clone)]
pub struct TaskScope {
    inner: Arc<TaskScopeInner>,
}

struct TaskScopeInner {
    name: String,
    context: ScopeContext,
    job_queue: Arc<JobQueue>,
    shutdown_latch: CancelToken,
}

impl TaskScope {
    /// Creates the scope and starts its background task.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::NoRuntime`] if `config` has no runtime handle and this is
    /// not called from inside a Tokio runtime.
    pub fn try_new(config: ScopeConfig) -> Result<Self, ScopeError> {
        let runtime_handle = match config.runtime_handle {
            Some(it) => it,
            None => Handle::try_current().map_err(|_| ScopeError::NoRuntime)?,
        };

        let cancel_token = match &config.lineage {
            ScopeLineage::Detached => CancelToken::new(),
            ScopeLineage::Structured(parent) => parent.child_token(),
        };

        let scope_id = ScopeId::next();
        let context =
            ScopeContext::new(scope_id, config.priority, config.locals, cancel_token);
        let job_queue = Arc::new(JobQueue::new());
        let shutdown_latch = CancelToken::new();

        let worker = ScopeWorker {
            context: context.clone(),
            job_queue: Arc::clone(&job_queue),
            drain_on_cancel: config.drain_on_cancel,
            cancel_grace_period: config.cancel_grace_period,
            runtime_handle: runtime_handle.clone(),
            children: JoinSet::new(),
        };
        let shutdown_latch_guard = ShutdownLatchGuard {
            shutdown_latch: shutdown_latch.clone(),
        };
        let span = tracing::debug_span!(
            "task_scope",
            scope_id = %scope_id,
            name = %config.name,
            priority = ?config.priority,
        );
        drop(runtime_handle.spawn(worker.run(shutdown_latch_guard).instrument(span)));

        Ok(Self {
            inner: Arc::new(TaskScopeInner {
                name: config.name,
                context,
                job_queue,
                shutdown_latch,
            }),
        })
    }

    /// Submits `job`. Returns `false` (and drops `job` without running it) if the scope
    /// is cancelled.
    pub fn launch(&self, job: Job) -> bool {
        !self.is_cancelled() && self.inner.job_queue.submit(job)
    }

    /// [`launch()`] for a closure, so callers don't need to build the [`Job`].
    ///
    /// ```no_run
    /// # use r3bl_async_scope::{ScopeConfig, TaskScope, ok};
    /// # async fn it() -> miette::Result<()> {
    /// let scope = TaskScope::try_new(ScopeConfig::default())?;
    /// scope.launch_fn(|ctx| async move {
    ///     tokio::select! {
    ///         () = ctx.cancelled() => {}
    ///         () = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
    ///     }
    ///     ok!()
    /// });
    /// # ok!()
    /// # }
    /// ```
    ///
    /// [`launch()`]: Self::launch
    pub fn launch_fn<F, Fut>(&self, f: F) -> bool
    where
        F: FnOnce(ScopeContext) -> Fut + Send + 'static,
        Fut: Future<Output = miette::Result<()>> + Send + 'static,
    {
        self.launch(Job::new(f))
    }

    /// Like [`launch()`], but says why the job was refused.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Cancelled`] if the scope is cancelled.
    ///
    /// [`launch()`]: Self::launch
    pub fn try_launch(&self, job: Job) -> Result<(), ScopeError> {
        if self.launch(job) {
            Ok(())
        } else {
            Err(ScopeError::Cancelled)
        }
    }

    /// Cancels the scope and every job in it. Idempotent.
    pub fn cancel(&self) {
        if !self.is_cancelled() {
            tracing::debug!(message = "cancelling scope", scope_id = %self.id());
        }
        self.inner.context.cancel_token().cancel();
        self.inner.job_queue.close();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.inner.context.is_cancelled() }

    #[must_use]
    pub fn id(&self) -> ScopeId { self.inner.context.scope_id() }

    #[must_use]
    pub fn name(&self) -> &str { &self.inner.name }

    /// The context every job of this scope receives.
    #[must_use]
    pub fn context(&self) -> &ScopeContext { &self.inner.context }

    /// Config for a scope nested under this one. See [`ScopeConfig::child_of()`].
    #[must_use]
    pub fn child_config(&self) -> ScopeConfig { self.inner.context.child_config() }

    /// Waits until the background task is gone: intake stopped, and every child job has
    /// finished or been aborted. Only returns after the scope is cancelled.
    pub async fn await_shutdown(&self) { self.inner.shutdown_latch.cancelled().await; }

    /// `true` once [`await_shutdown()`] would return immediately.
    ///
    /// [`await_shutdown()`]: Self::await_shutdown
    #[must_use]
    pub fn is_finished(&self) -> bool { self.inner.shutdown_latch.is_cancelled() }
}

impl PartialEq for TaskScope {
    fn eq(&self, other: &Self) -> bool { self.id() == other.id() }
}

impl Eq for TaskScope {}

impl Hash for TaskScope {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id().hash(state); }
}

impl Debug for TaskScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TaskScope")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("is_cancelled", &self.is_cancelled())
            .field("pending_jobs", &self.inner.job_queue.len())
            .finish()
    }
}
