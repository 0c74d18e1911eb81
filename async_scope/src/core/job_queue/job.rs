// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{ScopeContext, SuspendingQueue};
use futures_util::{FutureExt, future::BoxFuture};
use std::fmt::{Debug, Formatter, Result as FmtResult};

/// The queue a [`TaskScope`] drains. See [`SuspendingQueue`] for the semantics.
///
/// [`TaskScope`]: crate::TaskScope
pub type JobQueue = SuspendingQueue<Job>;

type JobFn = Box<dyn FnOnce(ScopeContext) -> BoxFuture<'static, miette::Result<()>> + Send>;

/// A deferred, potentially failing, unit of async work.
///
/// The caller sees a job as taking no arguments. The [`TaskScope`] that eventually
/// starts it hands it a [`ScopeContext`], which carries the scope's priority, locals and
/// cancellation signal. Jobs have no identity. Ownership moves into the [`JobQueue`] on
/// submit and into a spawned child task on dequeue.
///
/// A job's `Err` is logged by the scope and otherwise ignored. Callers that need the
/// result should send it through their own channel.
///
/// ```
/// use r3bl_async_scope::{Job, ok};
///
/// let job = Job::new(|ctx| async move {
///     if ctx.is_cancelled() {
///         return ok!();
///     }
///     // ... do the work ...
///     ok!()
/// });
/// # drop(job);
/// ```
///
/// [`TaskScope`]: crate::TaskScope
pub struct Job {
    run: JobFn,
}

impl Job {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(ScopeContext) -> Fut + Send + 'static,
        Fut: Future<Output = miette::Result<()>> + Send + 'static,
    {
        Self {
            run: Box::new(move |ctx| f(ctx).boxed()),
        }
    }

    /// Consumes the job, returning the future that does its work.
    pub fn run(self, ctx: ScopeContext) -> BoxFuture<'static, miette::Result<()>> {
        (self.run)(ctx)
    }
}

impl Debug for Job {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult { f.write_str("Job") }
}
